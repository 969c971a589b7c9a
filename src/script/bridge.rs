//! Subprocess bridge for interpreted prompt scripts.
//!
//! Scripts are never executed during loading. A dynamic prompt holds
//! the bridge and runs it only when the evaluator invokes the prompt.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::eyre;
use serde_json::Value;
use tokio::process::Command;

use crate::prompt::{EvalContext, PromptFunction};

/// Executes script files out of process.
#[async_trait]
pub trait ScriptBridge: Send + Sync {
    /// Call a named function in the script with JSON arguments and
    /// return its decoded result.
    async fn run_function(
        &self,
        script: &Path,
        function: &str,
        args: &[Value],
    ) -> Result<Value, eyre::Error>;

    /// Run the whole script as a subprocess with one serialized
    /// argument and return its joined standard output.
    async fn run_file(&self, script: &Path, arg: &Value) -> Result<String, eyre::Error>;
}

/// One-shot harness: import the script by path, call the named
/// function with decoded JSON arguments, print the result as JSON.
const FUNCTION_HARNESS: &str = r#"
import importlib.util, json, sys
spec = importlib.util.spec_from_file_location("prompt_module", sys.argv[1])
module = importlib.util.module_from_spec(spec)
spec.loader.exec_module(module)
result = getattr(module, sys.argv[2])(*json.loads(sys.argv[3]))
print(json.dumps(result))
"#;

/// Bridge that shells out to an interpreter, `python3` by default.
#[derive(Debug, Clone)]
pub struct SubprocessBridge {
    interpreter: String,
}

impl Default for SubprocessBridge {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl SubprocessBridge {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

#[async_trait]
impl ScriptBridge for SubprocessBridge {
    async fn run_function(
        &self,
        script: &Path,
        function: &str,
        args: &[Value],
    ) -> Result<Value, eyre::Error> {
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(FUNCTION_HARNESS)
            .arg(script)
            .arg(function)
            .arg(serde_json::to_string(args)?)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(eyre!(
                "Function '{}' in {} failed with {}: {}",
                function,
                script.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(serde_json::from_str(stdout.trim())?)
    }

    async fn run_file(&self, script: &Path, arg: &Value) -> Result<String, eyre::Error> {
        let output = Command::new(&self.interpreter)
            .arg(script)
            .arg(serde_json::to_string(arg)?)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        // A failing interpreter is fatal; a clean exit with empty
        // stdout is a valid empty result.
        if !output.status.success() {
            return Err(eyre!(
                "Script {} failed with {}: {}",
                script.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches('\n').to_string())
    }
}

/// Dynamic prompt bound to one function inside a script file.
pub struct NamedScriptFunction {
    bridge: Arc<dyn ScriptBridge>,
    script: PathBuf,
    function: String,
}

impl NamedScriptFunction {
    pub fn new(bridge: Arc<dyn ScriptBridge>, script: PathBuf, function: String) -> Self {
        Self {
            bridge,
            script,
            function,
        }
    }
}

#[async_trait]
impl PromptFunction for NamedScriptFunction {
    fn render(&self) -> String {
        format!("{}:{}", self.script.display(), self.function)
    }

    async fn call(&self, ctx: &EvalContext) -> Result<String, eyre::Error> {
        let args = vec![serde_json::to_value(ctx)?];
        let result = self.bridge.run_function(&self.script, &self.function, &args).await?;
        Ok(match result {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

/// Legacy dynamic prompt: run the whole script with the serialized
/// context as its single argument.
pub struct WholeFileScriptFunction {
    bridge: Arc<dyn ScriptBridge>,
    script: PathBuf,
}

impl WholeFileScriptFunction {
    pub fn new(bridge: Arc<dyn ScriptBridge>, script: PathBuf) -> Self {
        Self { bridge, script }
    }
}

#[async_trait]
impl PromptFunction for WholeFileScriptFunction {
    fn render(&self) -> String {
        self.script.display().to_string()
    }

    async fn call(&self, ctx: &EvalContext) -> Result<String, eyre::Error> {
        let arg = serde_json::to_value(ctx)?;
        self.bridge.run_file(&self.script, &arg).await
    }
}
