//! Heuristic classification of "probably a path" vs. "probably text".

/// URI schemes that reference remote prompt registries, never files.
const NON_FILE_SCHEMES: [&str; 2] = ["portkey://", "langfuse://"];

/// Judge whether a prompt reference looks like a file path.
///
/// True when the string has no newline, carries no registry scheme,
/// and either contains a path separator, a glob star, or a one- or
/// two-character extension. Only used to decide whether a missing file
/// deserves a warning; never changes control flow.
pub fn maybe_filepath(s: &str) -> bool {
    if s.contains('\n') {
        return false;
    }
    if NON_FILE_SCHEMES.iter().any(|scheme| s.contains(scheme)) {
        return false;
    }

    let bytes = s.as_bytes();
    let short_extension = (bytes.len() >= 3 && bytes[bytes.len() - 3] == b'.')
        || (bytes.len() >= 4 && bytes[bytes.len() - 4] == b'.');

    s.contains('/') || s.contains('\\') || s.contains('*') || short_extension
}
