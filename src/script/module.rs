//! Module loading for function-bearing script files.
//!
//! Module scripts export prompt functions; the loader binds one export
//! per prompt entry. Execution is deferred until the prompt is invoked.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::eyre;

use crate::error::Result;
use crate::prompt::{EvalContext, PromptFunction};

/// Loads a script module and binds one exported function.
pub trait ModuleLoader: Send + Sync {
    /// Bind `function` (or the default export when `None`) from the
    /// module at `script`.
    fn load(&self, script: &Path, function: Option<&str>) -> Result<Arc<dyn PromptFunction>>;
}

/// One-shot harness: require the module, pick the export, call it with
/// decoded JSON arguments, print the result.
const NODE_HARNESS: &str = r#"
const [script, name, args] = process.argv.slice(1);
const module = require(script);
const fn = name ? module[name] : (module.default ?? module);
Promise.resolve(fn(...JSON.parse(args))).then((result) => {
    process.stdout.write(typeof result === 'string' ? result : JSON.stringify(result));
});
"#;

/// Default loader: binds lazily and defers execution to a `node`
/// one-shot harness when the bound function is invoked.
#[derive(Debug, Clone, Default)]
pub struct NodeModuleLoader;

impl ModuleLoader for NodeModuleLoader {
    fn load(&self, script: &Path, function: Option<&str>) -> Result<Arc<dyn PromptFunction>> {
        Ok(Arc::new(NodeFunction {
            script: script.to_path_buf(),
            function: function.map(str::to_string),
        }))
    }
}

/// A prompt function backed by a node module export.
struct NodeFunction {
    script: PathBuf,
    function: Option<String>,
}

#[async_trait]
impl PromptFunction for NodeFunction {
    fn render(&self) -> String {
        match &self.function {
            Some(function) => format!("{}:{}", self.script.display(), function),
            None => self.script.display().to_string(),
        }
    }

    async fn call(&self, ctx: &EvalContext) -> std::result::Result<String, eyre::Error> {
        let args = serde_json::to_string(&[serde_json::to_value(ctx)?])?;
        let output = tokio::process::Command::new("node")
            .arg("-e")
            .arg(NODE_HARNESS)
            .arg(&self.script)
            .arg(self.function.as_deref().unwrap_or(""))
            .arg(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(eyre!(
                "Module {} failed with {}: {}",
                self.render(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
