//! The backend capability the fabric consumes.

use aurarouter_core::Result;

use crate::types::{ChatMessage, GenerateResult};

/// A model backend.
///
/// `generate` must return `Err` on failure rather than an empty success.
/// `generate_with_history` has a flattening default; backends with a native
/// chat endpoint override it.
pub trait Provider: Send + Sync {
    /// Provider kind name (`ollama`, `claude`, ...).
    fn name(&self) -> &str;

    /// Model id this instance was built for.
    fn model_id(&self) -> &str;

    fn generate(&self, prompt: &str, json_mode: bool) -> Result<GenerateResult>;

    fn generate_with_history(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        json_mode: bool,
    ) -> Result<GenerateResult> {
        self.generate(&flatten_history(messages, system_prompt), json_mode)
    }
}

/// Render a conversation as a single prompt.
pub fn flatten_history(messages: &[ChatMessage], system_prompt: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(system.trim());
        prompt.push_str("\n\n");
    }
    for message in messages {
        prompt.push_str(&message.role.to_uppercase());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.trim_end().to_string()
}
