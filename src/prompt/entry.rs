//! Prompt entries and the executable-prompt seam.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context handed to a dynamic prompt function when it is invoked.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalContext {
    /// Test variables available to the prompt.
    pub vars: HashMap<String, Value>,

    /// The provider the prompt is being rendered for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderInfo>,
}

/// The provider fields exposed to prompt functions.
///
/// Scripts never see the full provider configuration, only this slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An executable prompt: given an evaluation context, produce the
/// prompt text to send.
#[async_trait]
pub trait PromptFunction: Send + Sync {
    /// Stable textual rendering, used as the prompt's raw form and as
    /// its fallback label.
    fn render(&self) -> String;

    /// Produce the prompt text for the given context.
    async fn call(&self, ctx: &EvalContext) -> Result<String, eyre::Error>;
}

/// One unit of prompt content plus its display label.
///
/// Downstream consumers pattern-match: `Static` is sent as-is,
/// `Dynamic` is invoked with the evaluation context first.
#[derive(Clone)]
pub enum Prompt {
    /// Literal prompt text.
    Static { raw: String, label: String },

    /// A prompt produced by invoking a function at evaluation time.
    Dynamic {
        raw: String,
        label: String,
        function: Arc<dyn PromptFunction>,
    },
}

impl Prompt {
    /// Build a static prompt.
    pub fn text(raw: impl Into<String>, label: impl Into<String>) -> Self {
        Prompt::Static {
            raw: raw.into(),
            label: label.into(),
        }
    }

    /// Build a dynamic prompt bound to an executable function.
    pub fn dynamic(
        raw: impl Into<String>,
        label: impl Into<String>,
        function: Arc<dyn PromptFunction>,
    ) -> Self {
        Prompt::Dynamic {
            raw: raw.into(),
            label: label.into(),
            function,
        }
    }

    /// The textual content (or the rendering of the callable).
    pub fn raw(&self) -> &str {
        match self {
            Prompt::Static { raw, .. } | Prompt::Dynamic { raw, .. } => raw,
        }
    }

    /// The user-facing identifier for this prompt.
    pub fn label(&self) -> &str {
        match self {
            Prompt::Static { label, .. } | Prompt::Dynamic { label, .. } => label,
        }
    }

    /// The executable form, when this prompt is dynamic.
    pub fn function(&self) -> Option<&Arc<dyn PromptFunction>> {
        match self {
            Prompt::Static { .. } => None,
            Prompt::Dynamic { function, .. } => Some(function),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Prompt::Dynamic { .. })
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Static { raw, label } => f
                .debug_struct("Static")
                .field("raw", raw)
                .field("label", label)
                .finish(),
            Prompt::Dynamic { raw, label, function } => f
                .debug_struct("Dynamic")
                .field("raw", raw)
                .field("label", label)
                .field("function", &function.render())
                .finish(),
        }
    }
}
