//! OpenAI-compatible chat completions client.
//!
//! Serves both the remote `openapi` kind and the local `llamacpp` server,
//! which speaks the same `/chat/completions` dialect.

use reqwest::blocking::Client;
use serde_json::{json, Value};

use aurarouter_core::{Error, ModelConfig, ProviderKind, Result};

use crate::http::{base_url, build_client, merge_parameters, post_json, require_api_key};
use crate::provider::Provider;
use crate::types::{ChatMessage, GenerateResult};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLAMACPP_URL: &str = "http://localhost:8080/v1";

const RESERVED: &[&str] = &["model", "messages", "stream", "response_format"];

pub struct OpenAiCompatProvider {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    model_name: String,
    parameters: Value,
    context_limit: Option<u32>,
}

impl OpenAiCompatProvider {
    /// Remote OpenAI-compatible endpoint; an API key is required.
    pub fn remote(model_id: &str, config: &ModelConfig) -> Result<Self> {
        let api_key = require_api_key(model_id, config)?;
        Self::build(ProviderKind::Openapi, model_id, config, Some(api_key), DEFAULT_OPENAI_URL)
    }

    /// Local llama.cpp server; the key is optional.
    pub fn llamacpp(model_id: &str, config: &ModelConfig) -> Result<Self> {
        let api_key = config.resolved_api_key();
        Self::build(ProviderKind::Llamacpp, model_id, config, api_key, DEFAULT_LLAMACPP_URL)
    }

    fn build(
        kind: ProviderKind,
        model_id: &str,
        config: &ModelConfig,
        api_key: Option<String>,
        default_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            kind,
            base_url: base_url(config, default_url),
            api_key,
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
        let mut msgs: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            msgs.push(json!({"role": "system", "content": system}));
        }
        msgs.extend(
            messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content})),
        );

        let mut body = json!({
            "model": self.model_name,
            "messages": msgs,
            "stream": false,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        merge_parameters(&mut body, &self.parameters, RESERVED);
        body
    }

    fn parse_response(&self, reply: &Value) -> Result<GenerateResult> {
        let text = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                Error::Provider(format!("No completion in reply for {}", self.model_id))
            })?;
        let mut result = GenerateResult::new(text, &self.model_id, self.name()).with_tokens(
            reply["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            reply["usage"]["completion_tokens"].as_u64().unwrap_or(0),
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
        let url = format!("{}/chat/completions", self.base_url);
        let headers: Vec<(&str, String)> = self
            .api_key
            .iter()
            .map(|key| ("Authorization", format!("Bearer {}", key)))
            .collect();
        let body = self.request_body(messages, system, json_mode);
        let reply = post_json(&self.client, &url, &headers, &body)?;
        self.parse_response(&reply)
    }
}

impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.kind.as_str()
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
