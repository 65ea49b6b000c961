//! Google Gemini `generateContent` client.

use reqwest::blocking::Client;
use serde_json::{json, Value};

use aurarouter_core::{Error, ModelConfig, Result};

use crate::http::{base_url, build_client, merge_parameters, post_json, require_api_key};
use crate::provider::Provider;
use crate::types::{ChatMessage, GenerateResult};

pub const DEFAULT_GOOGLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
    model_name: String,
    parameters: Value,
    context_limit: Option<u32>,
}

impl GoogleProvider {
    pub fn new(model_id: &str, config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: base_url(config, DEFAULT_GOOGLE_URL),
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
        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                // Gemini calls the assistant "model"
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut generation_config = json!({});
        merge_parameters(&mut generation_config, &self.parameters, &[]);
        if json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        let mut system_parts: Vec<&str> = system.into_iter().collect();
        system_parts.extend(
            messages
                .iter()
                .filter(|m| m.role == "system")
                .map(|m| m.content.as_str()),
        );
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": system_parts.join("\n\n")}]});
        }
        body
    }

    fn parse_response(&self, reply: &Value) -> Result<GenerateResult> {
        let parts = reply["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| {
                let reason = reply["promptFeedback"]["blockReason"]
                    .as_str()
                    .unwrap_or("no candidates");
                Error::Provider(format!("Gemini reply for {}: {}", self.model_id, reason))
            })?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        let mut result = GenerateResult::new(text, &self.model_id, self.name()).with_tokens(
            reply["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0),
            reply["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0),
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
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_name, self.api_key
        );
        let body = self.request_body(messages, system, json_mode);
        let reply = post_json(&self.client, &url, &[], &body)?;
        self.parse_response(&reply)
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
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

    fn provider() -> GoogleProvider {
        let mut config = ModelConfig::new("google");
        config.api_key = Some("AIza-test".into());
        config.model_name = Some("gemini-2.0-flash".into());
        config.parameters = json!({"temperature": 0.4});
        GoogleProvider::new("cloud_gemini", &config).unwrap()
    }

    #[test]
    fn test_request_body() {
        let messages = vec![ChatMessage::user("q"), ChatMessage::assistant("a")];
        let body = provider().request_body(&messages, Some("sys"), true);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["generationConfig"]["temperature"], 0.4);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn test_parse_response() {
        let reply = json!({
            "candidates": [{"content": {"parts": [{"text": "hello "}, {"text": "world"}]}}],
            "usageMetadata": {"promptTokenCount": 9, "candidatesTokenCount": 2},
        });
        let result = provider().parse_response(&reply).unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.input_tokens, 9);
        assert_eq!(result.output_tokens, 2);
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let reply = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = provider().parse_response(&reply).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
