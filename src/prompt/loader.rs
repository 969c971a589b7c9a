//! Content loading: one resolved reference to prompt entries.
//!
//! Classification happens once per path; each content kind has its own
//! non-overlapping handler.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ResolveOptions;
use crate::error::{PromptrError, Result};
use crate::prompt::entry::{Prompt, PromptFunction};
use crate::prompt::filepath::maybe_filepath;
use crate::prompt::normalize::{InputShape, ResolutionContext, ResolvedPath};
use crate::script::{ModuleLoader, NamedScriptFunction, ScriptBridge, WholeFileScriptFunction};

/// Extensions whose files are loaded as modules exporting a function.
pub const MODULE_EXTENSIONS: [&str; 3] = ["js", "cjs", "mjs"];

/// Extensions executed through the interpreter bridge.
pub const INTERPRETED_EXTENSIONS: [&str; 1] = ["py"];

/// Extension holding one prompt per line.
pub const LINE_RECORD_EXTENSION: &str = "jsonl";

/// Extensions read as plain prompt text.
pub const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// What an existing resolved path turned out to hold.
#[derive(Debug, Clone, PartialEq)]
enum ContentKind {
    Module { function: Option<String> },
    Interpreted { function: Option<String> },
    LineRecords,
    Text,
    Unknown,
}

fn classify(path: &Path, function: Option<String>) -> ContentKind {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some(ext) if MODULE_EXTENSIONS.contains(&ext) => ContentKind::Module { function },
        Some(ext) if INTERPRETED_EXTENSIONS.contains(&ext) => ContentKind::Interpreted { function },
        Some(ext) if ext == LINE_RECORD_EXTENSION => ContentKind::LineRecords,
        Some(ext) if TEXT_EXTENSIONS.contains(&ext) => ContentKind::Text,
        _ => ContentKind::Unknown,
    }
}

/// Split a trailing `:function` from the filename, but only when the
/// part before the colon carries a script extension. A colon anywhere
/// else stays part of the filename.
fn split_function_suffix(resolved: &Path) -> (PathBuf, Option<String>) {
    let Some(name) = resolved.file_name().and_then(|name| name.to_str()) else {
        return (resolved.to_path_buf(), None);
    };

    if let Some((stem, function)) = name.rsplit_once(':') {
        let script_stem = Path::new(stem)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                MODULE_EXTENSIONS.contains(&ext) || INTERPRETED_EXTENSIONS.contains(&ext)
            });
        if script_stem && !function.is_empty() {
            return (resolved.with_file_name(stem), Some(function.to_string()));
        }
    }

    (resolved.to_path_buf(), None)
}

/// Key into the display-label index for a path plus optional function.
fn function_key(path: &Path, function: Option<&str>) -> String {
    match function {
        Some(function) => format!("{}:{}", path.display(), function),
        None => path.display().to_string(),
    }
}

/// Loads prompt entries for one resolved path.
///
/// Borrows the read-only resolution context and the collaborators for
/// the duration of a single orchestrator call.
pub(crate) struct ContentLoader<'a> {
    pub ctx: &'a ResolutionContext,
    pub options: &'a ResolveOptions,
    pub modules: &'a dyn ModuleLoader,
    pub bridge: &'a Arc<dyn ScriptBridge>,
}

impl ContentLoader<'_> {
    /// Produce the ordered prompt entries for one resolved reference.
    pub fn load(&self, info: &ResolvedPath) -> Result<Vec<Prompt>> {
        let (file_path, function) = split_function_suffix(&info.resolved);

        let prompts = match fs::metadata(&file_path) {
            Err(source) => {
                if self.ctx.is_forced(&info.raw) || self.options.strict_files {
                    return Err(PromptrError::MissingFile { path: file_path, source });
                }
                if maybe_filepath(&info.raw) {
                    log::warn!(
                        "Prompt source '{}' does not exist on disk; treating it as literal prompt text",
                        info.raw
                    );
                }
                self.split_delimited(Prompt::text(info.raw.clone(), info.raw.clone()))
            }
            Ok(metadata) if metadata.is_dir() => self.load_directory(&file_path)?,
            Ok(_) => match classify(&file_path, function) {
                ContentKind::Module { function } => {
                    vec![self.load_module(info, &file_path, function)?]
                }
                ContentKind::Interpreted { function } => {
                    vec![self.load_interpreted(info, &file_path, function)?]
                }
                ContentKind::LineRecords => self.load_line_records(&file_path)?,
                ContentKind::Text => self.split_delimited(self.load_text(info, &file_path)?),
                ContentKind::Unknown => Vec::new(),
            },
        };

        if prompts.is_empty() {
            return Err(PromptrError::NoPromptsFound(format!(
                "'{}' (resolved to {})",
                info.raw,
                file_path.display()
            )));
        }
        Ok(prompts)
    }

    /// One prompt per file in the directory, non-recursive, in name
    /// order. Directory results are never delimiter-split.
    fn load_directory(&self, dir: &Path) -> Result<Vec<Prompt>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .map(|entry| entry.path())
            .collect();
        files.sort();

        let mut prompts = Vec::with_capacity(files.len());
        for path in files {
            let content = fs::read_to_string(&path)?;
            prompts.push(Prompt::text(content.clone(), content));
        }
        Ok(prompts)
    }

    /// Bind an exported function from a module script.
    fn load_module(
        &self,
        info: &ResolvedPath,
        path: &Path,
        function: Option<String>,
    ) -> Result<Prompt> {
        let bound = self.modules.load(path, function.as_deref())?;
        let raw = bound.render();
        let key = function_key(path, function.as_deref());
        let label = self
            .ctx
            .display_label(&key)
            .map(str::to_string)
            .or_else(|| info.label.clone())
            .unwrap_or_else(|| raw.clone());
        Ok(Prompt::dynamic(raw, label, bound))
    }

    /// Wrap an interpreted script in a deferred bridge invocation.
    fn load_interpreted(
        &self,
        info: &ResolvedPath,
        path: &Path,
        function: Option<String>,
    ) -> Result<Prompt> {
        let raw = fs::read_to_string(path)?;
        let key = function_key(path, function.as_deref());

        // Named specs keep the user's labels; unnamed ones show the
        // script content itself.
        let label = if self.ctx.shape == InputShape::Named {
            self.ctx
                .display_label(&key)
                .map(str::to_string)
                .or_else(|| info.label.clone())
                .unwrap_or_else(|| key.clone())
        } else {
            raw.clone()
        };

        let bound: Arc<dyn PromptFunction> = match function {
            Some(function) => Arc::new(NamedScriptFunction::new(
                self.bridge.clone(),
                path.to_path_buf(),
                function,
            )),
            None => Arc::new(WholeFileScriptFunction::new(
                self.bridge.clone(),
                path.to_path_buf(),
            )),
        };
        Ok(Prompt::dynamic(raw, label, bound))
    }

    /// One prompt per non-empty line.
    fn load_line_records(&self, path: &Path) -> Result<Vec<Prompt>> {
        let content = fs::read_to_string(path)?;
        Ok(content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| Prompt::text(line, line))
            .collect())
    }

    /// Whole file as one prompt, labeled by display label or path.
    fn load_text(&self, info: &ResolvedPath, path: &Path) -> Result<Prompt> {
        let raw = fs::read_to_string(path)?;
        let key = path.display().to_string();
        let label = self
            .ctx
            .display_label(&key)
            .map(str::to_string)
            .or_else(|| info.label.clone())
            .unwrap_or(key);
        Ok(Prompt::text(raw, label))
    }

    /// Split a single static prompt into one prompt per delimited
    /// segment, trimming and dropping empty segments. Dynamic prompts
    /// pass through untouched.
    fn split_delimited(&self, prompt: Prompt) -> Vec<Prompt> {
        let Prompt::Static { raw, .. } = prompt else {
            return vec![prompt];
        };
        raw.split(self.options.delimiter.as_str())
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| Prompt::text(segment, segment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PromptSourceEntry, PromptSourceSpec};
    use crate::prompt::entry::EvalContext;
    use crate::prompt::normalize::normalize;
    use crate::script::{NodeModuleLoader, SubprocessBridge};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    struct StubBridge;

    #[async_trait]
    impl ScriptBridge for StubBridge {
        async fn run_function(
            &self,
            _script: &Path,
            _function: &str,
            _args: &[Value],
        ) -> std::result::Result<Value, eyre::Error> {
            Ok(Value::String("stub".to_string()))
        }

        async fn run_file(&self, _script: &Path, _arg: &Value) -> std::result::Result<String, eyre::Error> {
            Ok("stub".to_string())
        }
    }

    struct StubFunction {
        rendering: String,
    }

    #[async_trait]
    impl PromptFunction for StubFunction {
        fn render(&self) -> String {
            self.rendering.clone()
        }

        async fn call(&self, _ctx: &EvalContext) -> std::result::Result<String, eyre::Error> {
            Ok("stub output".to_string())
        }
    }

    struct StubModuleLoader;

    impl ModuleLoader for StubModuleLoader {
        fn load(&self, script: &Path, function: Option<&str>) -> Result<Arc<dyn PromptFunction>> {
            Ok(Arc::new(StubFunction {
                rendering: function_key(script, function),
            }))
        }
    }

    fn load_spec(spec: &PromptSourceSpec, base: &Path, options: &ResolveOptions) -> Result<Vec<Prompt>> {
        let (ctx, paths) = normalize(spec, base)?;
        let modules = StubModuleLoader;
        let bridge: Arc<dyn ScriptBridge> = Arc::new(StubBridge);
        let loader = ContentLoader {
            ctx: &ctx,
            options,
            modules: &modules,
            bridge: &bridge,
        };
        let mut prompts = Vec::new();
        for info in &paths {
            prompts.extend(loader.load(info)?);
        }
        Ok(prompts)
    }

    fn load_single(spec: PromptSourceSpec, base: &Path) -> Result<Vec<Prompt>> {
        load_spec(&spec, base, &ResolveOptions::default())
    }

    #[test]
    fn test_split_function_suffix() {
        let (path, function) = split_function_suffix(Path::new("/p/prompts.py:make_prompt"));
        assert_eq!(path, PathBuf::from("/p/prompts.py"));
        assert_eq!(function.as_deref(), Some("make_prompt"));

        // A colon without a script extension before it is literal.
        let (path, function) = split_function_suffix(Path::new("/p/notes:v2.txt"));
        assert_eq!(path, PathBuf::from("/p/notes:v2.txt"));
        assert_eq!(function, None);

        let (path, function) = split_function_suffix(Path::new("/p/prompts.js:makePrompt"));
        assert_eq!(path, PathBuf::from("/p/prompts.js"));
        assert_eq!(function.as_deref(), Some("makePrompt"));

        let (path, function) = split_function_suffix(Path::new("/p/plain.txt"));
        assert_eq!(path, PathBuf::from("/p/plain.txt"));
        assert_eq!(function, None);
    }

    #[test]
    fn test_missing_file_falls_back_to_literal_text() {
        let dir = TempDir::new().unwrap();
        let spec = PromptSourceSpec::Path("Tell me a joke".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "Tell me a joke");
        assert_eq!(prompts[0].label(), "Tell me a joke");
        assert!(!prompts[0].is_dynamic());
    }

    #[test]
    fn test_missing_path_like_reference_falls_back() {
        let dir = TempDir::new().unwrap();
        let spec = PromptSourceSpec::Path("missing.txt".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "missing.txt");
        assert_eq!(prompts[0].label(), "missing.txt");
    }

    #[test]
    fn test_missing_forced_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let spec = PromptSourceSpec::Path("file://missing.txt".to_string());
        let err = load_single(spec, dir.path()).unwrap_err();
        assert!(matches!(err, PromptrError::MissingFile { .. }));
    }

    #[test]
    fn test_missing_file_fatal_under_strict_mode() {
        let dir = TempDir::new().unwrap();
        let spec = PromptSourceSpec::Path("missing.txt".to_string());
        let options = ResolveOptions {
            strict_files: true,
            ..ResolveOptions::default()
        };
        let err = load_spec(&spec, dir.path(), &options).unwrap_err();
        assert!(matches!(err, PromptrError::MissingFile { .. }));
    }

    #[test]
    fn test_text_file_split_on_delimiter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.txt"), "Test prompt 1\n---\nTest prompt 2").unwrap();

        let spec = PromptSourceSpec::Path("prompts.txt".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].raw(), "Test prompt 1");
        assert_eq!(prompts[0].label(), "Test prompt 1");
        assert_eq!(prompts[1].raw(), "Test prompt 2");
        assert_eq!(prompts[1].label(), "Test prompt 2");
    }

    #[test]
    fn test_text_file_without_delimiter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.txt"), "Just one prompt\n").unwrap();

        let spec = PromptSourceSpec::Path("prompts.txt".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "Just one prompt");
    }

    #[test]
    fn test_delimiter_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.txt"), "one @@@ two @@@ three").unwrap();

        let spec = PromptSourceSpec::Path("prompts.txt".to_string());
        let options = ResolveOptions {
            delimiter: "@@@".to_string(),
            ..ResolveOptions::default()
        };
        let prompts = load_spec(&spec, dir.path(), &options).unwrap();

        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[1].raw(), "two");
    }

    #[test]
    fn test_empty_text_file_is_no_prompts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.txt"), "   \n").unwrap();

        let spec = PromptSourceSpec::Path("prompts.txt".to_string());
        let err = load_single(spec, dir.path()).unwrap_err();
        assert!(matches!(err, PromptrError::NoPromptsFound(_)));
    }

    #[test]
    fn test_line_records() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("prompts.jsonl"),
            "{\"role\": \"user\"}\n\n{\"role\": \"system\"}\n",
        )
        .unwrap();

        let spec = PromptSourceSpec::Path("prompts.jsonl".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].raw(), "{\"role\": \"user\"}");
        assert_eq!(prompts[0].label(), prompts[0].raw());
    }

    #[test]
    fn test_line_records_are_not_delimiter_split() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.jsonl"), "a --- b\n").unwrap();

        let spec = PromptSourceSpec::Path("prompts.jsonl".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "a --- b");
    }

    #[test]
    fn test_empty_line_records_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.jsonl"), "\n\n").unwrap();

        let spec = PromptSourceSpec::Path("prompts.jsonl".to_string());
        let err = load_single(spec, dir.path()).unwrap_err();
        assert!(matches!(err, PromptrError::NoPromptsFound(_)));
    }

    #[test]
    fn test_directory_one_prompt_per_file() {
        let dir = TempDir::new().unwrap();
        let prompt_dir = dir.path().join("prompts");
        fs::create_dir(&prompt_dir).unwrap();
        fs::write(prompt_dir.join("b.txt"), "second").unwrap();
        fs::write(prompt_dir.join("a.txt"), "first").unwrap();

        let spec = PromptSourceSpec::Path("prompts".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].raw(), "first");
        assert_eq!(prompts[1].raw(), "second");
        assert_eq!(prompts[0].label(), "first");
    }

    #[test]
    fn test_directory_single_file_is_not_split() {
        let dir = TempDir::new().unwrap();
        let prompt_dir = dir.path().join("prompts");
        fs::create_dir(&prompt_dir).unwrap();
        fs::write(prompt_dir.join("only.txt"), "one\n---\ntwo").unwrap();

        let spec = PromptSourceSpec::Path("prompts".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "one\n---\ntwo");
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("prompts")).unwrap();

        let spec = PromptSourceSpec::Path("prompts".to_string());
        let err = load_single(spec, dir.path()).unwrap_err();
        assert!(matches!(err, PromptrError::NoPromptsFound(_)));
    }

    #[test]
    fn test_module_script_binds_function() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.js"), "module.exports = () => 'hi';").unwrap();

        let spec = PromptSourceSpec::List(vec![PromptSourceEntry::Path(
            "prompts.js:makePrompt".to_string(),
        )]);
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].is_dynamic());
        let expected = format!("{}:makePrompt", dir.path().join("prompts.js").display());
        assert_eq!(prompts[0].raw(), expected);
        // A plain-string element is its own display label.
        assert_eq!(prompts[0].label(), "prompts.js:makePrompt");
    }

    #[test]
    fn test_interpreted_script_named_shape_uses_display_label() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.py"), "def make_prompt(ctx):\n    return 'hi'\n").unwrap();

        let spec = PromptSourceSpec::List(vec![PromptSourceEntry::Named(
            crate::config::NamedPromptSource {
                id: Some("prompts.py:make_prompt".to_string()),
                label: Some("Maker".to_string()),
            },
        )]);
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].is_dynamic());
        assert_eq!(prompts[0].label(), "Maker");
        assert!(prompts[0].raw().contains("def make_prompt"));
    }

    #[test]
    fn test_interpreted_script_unnamed_shape_uses_content_label() {
        let dir = TempDir::new().unwrap();
        let content = "def make_prompt(ctx):\n    return 'hi'\n";
        fs::write(dir.path().join("prompts.py"), content).unwrap();

        let spec = PromptSourceSpec::Path("prompts.py".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].label(), content);
        assert_eq!(prompts[0].raw(), content);
    }

    #[test]
    fn test_dynamic_prompt_is_never_delimiter_split() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.py"), "PROMPTS = '---'\n").unwrap();

        let spec = PromptSourceSpec::Path("prompts.py".to_string());
        let prompts = load_single(spec, dir.path()).unwrap();

        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].is_dynamic());
    }

    #[test]
    fn test_unknown_extension_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("prompts.pdf"), "binary-ish").unwrap();

        let spec = PromptSourceSpec::Path("prompts.pdf".to_string());
        let err = load_single(spec, dir.path()).unwrap_err();
        assert!(matches!(err, PromptrError::NoPromptsFound(_)));
    }

    #[test]
    fn test_text_label_from_map_form() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.txt"), "First body").unwrap();

        let spec = PromptSourceSpec::Map(crate::config::LabelMap(vec![(
            "one.txt".to_string(),
            "First".to_string(),
        )]));
        let prompts = load_single(spec, dir.path()).unwrap();

        // A single segment survives the delimiter pass, which relabels
        // it with its own trimmed content.
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].raw(), "First body");
        assert_eq!(prompts[0].label(), "First body");
    }

    #[test]
    fn test_default_collaborators_construct() {
        // The real collaborators are exercised end to end in the
        // integration tests; here they only need to wire up.
        let modules = NodeModuleLoader;
        let bound = modules.load(Path::new("/x/y.js"), Some("f")).unwrap();
        assert_eq!(bound.render(), "/x/y.js:f");
        let _bridge = SubprocessBridge::default();
    }
}
