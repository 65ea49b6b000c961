//! Anthropic Messages API client.

use reqwest::blocking::Client;
use serde_json::{json, Value};

use aurarouter_core::{Error, ModelConfig, Result};

use crate::http::{base_url, build_client, merge_parameters, post_json, require_api_key};
use crate::provider::Provider;
use crate::types::{ChatMessage, GenerateResult};

pub const DEFAULT_CLAUDE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

const JSON_INSTRUCTION: &str = "Respond with a single valid JSON value and nothing else.";
const RESERVED: &[&str] = &["model", "messages", "system", "stream"];

pub struct ClaudeProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
    model_name: String,
    parameters: Value,
    context_limit: Option<u32>,
}

impl ClaudeProvider {
    pub fn new(model_id: &str, config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: base_url(config, DEFAULT_CLAUDE_URL),
            api_key: require_api_key(model_id, config)?,
            model_id: model_id.to_string(),
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| model_id.to_string()),
            parameters: config.parameters.clone(),
            context_limit: config.context_limit,
        })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        json_mode: bool,
    ) -> Value {
        // System text goes in its own field, not in the message list
        let mut system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        if let Some(system) = system {
            system_parts.insert(0, system);
        }
        if json_mode {
            system_parts.push(JSON_INSTRUCTION);
        }

        let conv: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": conv,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });
        if !system_parts.is_empty() {
            body["system"] = json!(system_parts.join("\n\n"));
        }
        merge_parameters(&mut body, &self.parameters, RESERVED);
        body
    }

    fn parse_response(&self, reply: &Value) -> Result<GenerateResult> {
        if reply["type"] == "error" {
            let msg = reply["error"]["message"].as_str().unwrap_or("Unknown error");
            return Err(Error::Provider(format!("Anthropic error: {}", msg)));
        }

        let blocks = reply["content"].as_array().ok_or_else(|| {
            Error::Provider(format!("No content in reply for {}", self.model_id))
        })?;
        let text: String = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();

        let mut result = GenerateResult::new(text, &self.model_id, self.name()).with_tokens(
            reply["usage"]["input_tokens"].as_u64().unwrap_or(0),
            reply["usage"]["output_tokens"].as_u64().unwrap_or(0),
        );
        result.context_limit = self.context_limit;
        Ok(result)
    }

    fn complete(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
        json_mode: bool,
    ) -> Result<GenerateResult> {
        let url = format!("{}/v1/messages", self.base_url);
        let headers = [
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];
        let body = self.request_body(messages, system, json_mode);
        let reply = post_json(&self.client, &url, &headers, &body)?;
        self.parse_response(&reply)
    }
}

impl Provider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate(&self, prompt: &str, json_mode: bool) -> Result<GenerateResult> {
        self.complete(&[ChatMessage::user(prompt)], None, json_mode)
    }

    fn generate_with_history(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        json_mode: bool,
    ) -> Result<GenerateResult> {
        self.complete(messages, system_prompt, json_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ClaudeProvider {
        let mut config = ModelConfig::new("claude");
        config.api_key = Some("test-key".into());
        config.model_name = Some("claude-sonnet-4-20250514".into());
        config.parameters = json!({"max_tokens": 1024});
        ClaudeProvider::new("cloud_claude", &config).unwrap()
    }

    #[test]
    fn test_requires_key() {
        let config = ModelConfig::new("claude");
        assert!(ClaudeProvider::new("c", &config).is_err());
    }

    #[test]
    fn test_request_body_separates_system() {
        let messages = vec![
            ChatMessage::system("history sys"),
            ChatMessage::user("hi"),
        ];
        let body = provider().request_body(&messages, Some("top sys"), true);
        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        let system = body["system"].as_str().unwrap();
        assert!(system.starts_with("top sys\n\nhistory sys"));
        assert!(system.ends_with(JSON_INSTRUCTION));
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn test_parse_response() {
        let reply = json!({
            "type": "message",
            "content": [{"type": "text", "text": "part one "}, {"type": "text", "text": "two"}],
            "usage": {"input_tokens": 40, "output_tokens": 7},
        });
        let result = provider().parse_response(&reply).unwrap();
        assert_eq!(result.text, "part one two");
        assert_eq!(result.input_tokens, 40);
        assert_eq!(result.output_tokens, 7);
        assert_eq!(result.provider, "claude");
    }

    #[test]
    fn test_parse_error_reply() {
        let reply = json!({"type": "error", "error": {"message": "overloaded"}});
        let err = provider().parse_response(&reply).unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
