//! Orchestrates normalization and loading into the final prompt list.

use std::path::Path;
use std::sync::Arc;

use crate::config::{PromptSourceSpec, ResolveOptions};
use crate::error::Result;
use crate::prompt::entry::Prompt;
use crate::prompt::loader::ContentLoader;
use crate::prompt::normalize::normalize;
use crate::script::{ModuleLoader, NodeModuleLoader, ScriptBridge, SubprocessBridge};

/// Resolves prompt source specs into ordered prompt lists.
///
/// Collaborators default to the real module loader and subprocess
/// bridge; tests and embedders can swap either.
pub struct PromptReader {
    options: ResolveOptions,
    modules: Arc<dyn ModuleLoader>,
    bridge: Arc<dyn ScriptBridge>,
}

impl Default for PromptReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptReader {
    /// Reader with environment-derived options.
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::from_env())
    }

    /// Reader with explicit options.
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            options,
            modules: Arc::new(NodeModuleLoader),
            bridge: Arc::new(SubprocessBridge::default()),
        }
    }

    /// Replace the module-loading collaborator.
    pub fn with_module_loader(mut self, modules: Arc<dyn ModuleLoader>) -> Self {
        self.modules = modules;
        self
    }

    /// Replace the script-execution bridge.
    pub fn with_script_bridge(mut self, bridge: Arc<dyn ScriptBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    /// Resolve a prompt source spec into the ordered prompt list.
    ///
    /// Normalizes once, loads each resolved path in order, and
    /// concatenates the results. No deduplication, no reordering.
    pub fn read(&self, spec: &PromptSourceSpec, base_path: &Path) -> Result<Vec<Prompt>> {
        let (ctx, paths) = normalize(spec, base_path)?;
        let loader = ContentLoader {
            ctx: &ctx,
            options: &self.options,
            modules: self.modules.as_ref(),
            bridge: &self.bridge,
        };

        let mut prompts = Vec::new();
        for info in &paths {
            prompts.extend(loader.load(info)?);
        }
        log::debug!("Resolved {} prompt(s) from {:?}", prompts.len(), spec);
        Ok(prompts)
    }
}

/// Resolve prompts with environment-derived options and the default
/// collaborators.
pub fn read_prompts(spec: &PromptSourceSpec, base_path: &Path) -> Result<Vec<Prompt>> {
    PromptReader::new().read(spec, base_path)
}
