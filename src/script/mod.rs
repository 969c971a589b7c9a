//! Script execution collaborators.
//!
//! Dynamic prompts come from script files. Module scripts are bound
//! through [`ModuleLoader`]; interpreted scripts run through
//! [`ScriptBridge`] when the prompt function is invoked. Neither runs
//! anything at load time.

mod bridge;
mod module;

pub use bridge::{NamedScriptFunction, ScriptBridge, SubprocessBridge, WholeFileScriptFunction};
pub use module::{ModuleLoader, NodeModuleLoader};
