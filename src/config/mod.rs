//! Evaluation configuration.
//!
//! Models the slice of the eval config file this crate consumes: where
//! prompts come from and which providers run against them. Everything
//! else in the file belongs to the evaluator and is not parsed here.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{PromptrError, Result};
use crate::provider::ProviderFunction;

/// Prefix that forces file-only interpretation of a prompt reference.
pub const FILE_MARKER: &str = "file://";

/// Default delimiter separating multiple prompts in one text file.
pub const DEFAULT_PROMPT_DELIMITER: &str = "---";

/// Environment variable overriding the prompt delimiter.
pub const PROMPT_DELIMITER_ENV: &str = "PROMPTR_PROMPT_SEPARATOR";

/// Environment variable that makes every missing prompt file fatal.
pub const STRICT_FILES_ENV: &str = "PROMPTR_STRICT_FILES";

/// Top of the eval config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Free-form description shown in run output.
    pub description: Option<String>,

    /// Where prompts come from.
    pub prompts: Option<PromptSourceSpec>,

    /// Providers to evaluate against.
    pub providers: Option<ProvidersSpec>,
}

impl EvalConfig {
    /// Load an eval config from a YAML file.
    ///
    /// Parse failures are configuration errors; the caller typically
    /// resolves prompt references against the file's parent directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| PromptrError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        log::debug!("Loaded eval config from {}", path.display());
        Ok(config)
    }
}

/// The three accepted shapes for "where prompts come from".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PromptSourceSpec {
    /// A single path or glob.
    Path(String),

    /// An ordered list of paths and named sources.
    List(Vec<PromptSourceEntry>),

    /// A mapping from path to display label, in authored order.
    Map(LabelMap),
}

/// One element of the list form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PromptSourceEntry {
    /// A plain path, glob, or literal text.
    Path(String),

    /// A source named explicitly with `{ id, label }`.
    Named(NamedPromptSource),
}

/// A named source element.
///
/// Both fields are required; they are kept optional here so the
/// normalizer can reject incomplete elements with an error that points
/// at the offending element instead of a generic parse failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedPromptSource {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub label: Option<String>,
}

/// Path-to-label pairs preserving the order they were written in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct LabelMapVisitor;

        impl<'de> serde::de::Visitor<'de> for LabelMapVisitor {
            type Value = LabelMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping from path to display label")
            }

            fn visit_map<M>(self, mut access: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: serde::de::MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    pairs.push((key, value));
                }
                Ok(LabelMap(pairs))
            }
        }

        deserializer.deserialize_map(LabelMapVisitor)
    }
}

/// Providers as the user wrote them.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum ProvidersSpec {
    /// A single provider id.
    Id(String),

    /// A list of provider entries.
    List(Vec<ProviderEntry>),

    /// A provider supplied programmatically as a completion function.
    #[serde(skip)]
    Function(Arc<dyn ProviderFunction>),
}

impl fmt::Debug for ProvidersSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvidersSpec::Id(id) => f.debug_tuple("Id").field(id).finish(),
            ProvidersSpec::List(entries) => f.debug_tuple("List").field(entries).finish(),
            ProvidersSpec::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// One element of the provider list form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProviderEntry {
    /// An options object carrying its own id.
    Options(ProviderOptions),

    /// A single-key mapping from a display name to options.
    Keyed(HashMap<String, ProviderOptions>),
}

/// Per-provider options, as far as prompt scoping is concerned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderOptions {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    /// Prompt labels this provider is scoped to; absent means all.
    #[serde(default)]
    pub prompts: Option<Vec<String>>,

    /// Provider-specific settings, passed through untouched.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

/// Environment-level settings captured once per resolution call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Treat every missing prompt file as fatal.
    pub strict_files: bool,

    /// Delimiter splitting a single text file into multiple prompts.
    pub delimiter: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strict_files: false,
            delimiter: DEFAULT_PROMPT_DELIMITER.to_string(),
        }
    }
}

impl ResolveOptions {
    /// Read the environment once, at the start of a top-level call.
    pub fn from_env() -> Self {
        let strict_files = std::env::var(STRICT_FILES_ENV)
            .map(|value| flag_enabled(&value))
            .unwrap_or(false);
        let delimiter = std::env::var(PROMPT_DELIMITER_ENV)
            .unwrap_or_else(|_| DEFAULT_PROMPT_DELIMITER.to_string());
        Self { strict_files, delimiter }
    }
}

fn flag_enabled(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}
