//! Prompt source normalization.
//!
//! Converts the three accepted source shapes into an ordered list of
//! resolved references plus the read-only context the loader consults.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::{FILE_MARKER, NamedPromptSource, PromptSourceEntry, PromptSourceSpec};
use crate::error::{PromptrError, Result};

/// Which shape the user wrote the prompt sources in.
///
/// The shape alters label selection for interpreted scripts: a named
/// spec keeps the user's labels, an unnamed one falls back to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// One path or glob.
    Single,

    /// A list with only plain string elements.
    List,

    /// A list with at least one `{id, label}` element, or the map form.
    Named,
}

/// A user reference resolved against the base path.
///
/// Several values share one `raw` when a glob expands to several files.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// The reference as the user wrote it, force marker stripped.
    pub raw: String,

    /// The path after joining the base (and glob expansion, if any).
    pub resolved: PathBuf,

    /// Display label attached to this reference, if any.
    pub label: Option<String>,
}

/// Read-only side tables produced by normalization.
///
/// Built once per call, never mutated after being handed to the loader.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub shape: InputShape,
    /// Raw references that must resolve to a file on disk.
    force_files: HashSet<String>,
    /// Resolved path string (possibly `path:function`) to display label.
    display_labels: HashMap<String, String>,
}

impl ResolutionContext {
    /// Whether a missing file for this raw reference is a hard error.
    pub fn is_forced(&self, raw: &str) -> bool {
        self.force_files.contains(raw)
    }

    /// The display label recorded for a resolved path key, if any.
    pub fn display_label(&self, key: &str) -> Option<&str> {
        self.display_labels.get(key).map(String::as_str)
    }
}

/// Normalize a prompt source spec against a base directory.
pub fn normalize(
    spec: &PromptSourceSpec,
    base_path: &Path,
) -> Result<(ResolutionContext, Vec<ResolvedPath>)> {
    let mut force_files = HashSet::new();
    let mut display_labels = HashMap::new();
    let mut paths = Vec::new();

    let shape = match spec {
        PromptSourceSpec::Path(reference) => {
            let raw = strip_marker(reference, &mut force_files);
            let resolved = base_path.join(&raw);
            display_labels.insert(path_key(&resolved), raw.clone());
            paths.push(ResolvedPath { raw, resolved, label: None });
            InputShape::Single
        }
        PromptSourceSpec::List(entries) => {
            let mut shape = InputShape::List;
            for entry in entries {
                let (reference, label) = match entry {
                    PromptSourceEntry::Path(reference) => (reference.clone(), reference.clone()),
                    PromptSourceEntry::Named(named) => {
                        shape = InputShape::Named;
                        named_reference(named)?
                    }
                };
                let raw = strip_marker(&reference, &mut force_files);
                let resolved = base_path.join(&raw);
                display_labels.insert(path_key(&resolved), label.clone());
                expand_glob(raw, resolved, label, &mut paths);
            }
            shape
        }
        PromptSourceSpec::Map(map) => {
            // Mapping form implies file intent: no marker handling and
            // no glob expansion.
            for (reference, label) in &map.0 {
                let resolved = base_path.join(reference);
                display_labels.insert(path_key(&resolved), label.clone());
                paths.push(ResolvedPath {
                    raw: reference.clone(),
                    resolved,
                    label: Some(label.clone()),
                });
            }
            InputShape::Named
        }
    };

    Ok((
        ResolutionContext {
            shape,
            force_files,
            display_labels,
        },
        paths,
    ))
}

/// Extract id and label from a named element, both required.
fn named_reference(named: &NamedPromptSource) -> Result<(String, String)> {
    let describe = |named: &NamedPromptSource| {
        format!("{{ id: {:?}, label: {:?} }}", named.id, named.label)
    };
    let id = named
        .id
        .clone()
        .ok_or_else(|| PromptrError::Config(format!("Prompt source is missing an id: {}", describe(named))))?;
    let label = named
        .label
        .clone()
        .ok_or_else(|| PromptrError::Config(format!("Prompt source is missing a label: {}", describe(named))))?;
    Ok((id, label))
}

/// Strip the force marker, recording the stripped reference.
fn strip_marker(reference: &str, force_files: &mut HashSet<String>) -> String {
    match reference.strip_prefix(FILE_MARKER) {
        Some(stripped) => {
            force_files.insert(stripped.to_string());
            stripped.to_string()
        }
        None => reference.to_string(),
    }
}

/// Expand a resolved reference as a glob, or pass it through untouched
/// when nothing matches (references embedding `:function` never match).
fn expand_glob(raw: String, resolved: PathBuf, label: String, out: &mut Vec<ResolvedPath>) {
    let matches: Vec<PathBuf> = match glob::glob(&path_key(&resolved)) {
        Ok(iter) => iter.filter_map(|entry| entry.ok()).collect(),
        Err(_) => Vec::new(),
    };

    if matches.is_empty() {
        out.push(ResolvedPath {
            raw,
            resolved,
            label: Some(label),
        });
    } else {
        for resolved in matches {
            out.push(ResolvedPath {
                raw: raw.clone(),
                resolved,
                label: Some(label.clone()),
            });
        }
    }
}

pub(crate) fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
