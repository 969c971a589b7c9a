//! Provider-to-prompt scoping.
//!
//! Maps each configured provider to the prompt labels it should run.
//! Providers without their own `prompts` list get every label; an
//! empty map means no scoping was configured at all.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::{ProviderEntry, ProvidersSpec};
use crate::error::{PromptrError, Result};
use crate::prompt::{EvalContext, Prompt};

/// Map key used when the provider is a bare completion function.
pub const CUSTOM_FUNCTION_KEY: &str = "Custom function";

/// A provider supplied programmatically as a completion function.
#[async_trait]
pub trait ProviderFunction: Send + Sync {
    /// Produce a completion for the prompt under the given context.
    async fn call(&self, prompt: &str, ctx: &EvalContext) -> std::result::Result<String, eyre::Error>;
}

/// Build the provider-to-prompt-labels map.
pub fn provider_prompt_map(
    providers: Option<&ProvidersSpec>,
    prompts: &[Prompt],
) -> Result<HashMap<String, Vec<String>>> {
    let mut map = HashMap::new();
    let Some(providers) = providers else {
        return Ok(map);
    };

    let all_labels: Vec<String> = prompts.iter().map(|p| p.label().to_string()).collect();

    match providers {
        ProvidersSpec::Id(id) => {
            map.insert(id.clone(), all_labels);
        }
        ProvidersSpec::Function(_) => {
            map.insert(CUSTOM_FUNCTION_KEY.to_string(), all_labels);
        }
        ProvidersSpec::List(entries) => {
            for entry in entries {
                match entry {
                    ProviderEntry::Options(options) => {
                        let id = options.id.clone().ok_or_else(|| {
                            PromptrError::Config(
                                "Provider options must include an id".to_string(),
                            )
                        })?;
                        let labels = options
                            .prompts
                            .clone()
                            .unwrap_or_else(|| all_labels.clone());
                        if let Some(label) = &options.label {
                            map.insert(label.clone(), labels.clone());
                        }
                        map.insert(id, labels);
                    }
                    ProviderEntry::Keyed(keyed) => {
                        let Some((name, options)) = keyed.iter().next() else {
                            return Err(PromptrError::Config(
                                "Provider mapping must not be empty".to_string(),
                            ));
                        };
                        if keyed.len() > 1 {
                            return Err(PromptrError::Config(format!(
                                "Provider mapping must have exactly one key, found {}",
                                keyed.len()
                            )));
                        }
                        let key = options.id.clone().unwrap_or_else(|| name.clone());
                        let labels = options
                            .prompts
                            .clone()
                            .unwrap_or_else(|| all_labels.clone());
                        map.insert(key, labels);
                    }
                }
            }
        }
    }

    Ok(map)
}
