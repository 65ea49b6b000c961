//! Ollama local model client (`/api/generate` and `/api/chat`).

use reqwest::blocking::Client;
use serde_json::{json, Value};

use aurarouter_core::{Error, ModelConfig, Result};

use crate::http::{base_url, build_client, post_json};
use crate::provider::Provider;
use crate::types::{ChatMessage, GenerateResult};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model_id: String,
    model_name: String,
    parameters: Value,
    context_limit: Option<u32>,
}

impl OllamaProvider {
    pub fn new(model_id: &str, config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: base_url(config, DEFAULT_OLLAMA_URL),
            model_id: model_id.to_string(),
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| model_id.to_string()),
            parameters: config.parameters.clone(),
            context_limit: config.context_limit,
        })
    }

    fn generate_body(&self, prompt: &str, json_mode: bool) -> Value {
        let mut body = json!({
            "model": self.model_name,
            "prompt": prompt,
            "stream": false,
        });
        self.apply_common(&mut body, json_mode);
        body
    }

    fn chat_body(&self, messages: &[ChatMessage], system: Option<&str>, json_mode: bool) -> Value {
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
        self.apply_common(&mut body, json_mode);
        body
    }

    fn apply_common(&self, body: &mut Value, json_mode: bool) {
        if json_mode {
            body["format"] = json!("json");
        }
        // Ollama takes sampling parameters under `options`
        if self.parameters.is_object() {
            body["options"] = self.parameters.clone();
        }
    }

    fn parse(&self, reply: &Value, text: Option<&str>) -> Result<GenerateResult> {
        let text = text.ok_or_else(|| {
            Error::Provider(format!("Ollama reply for {} has no text", self.model_id))
        })?;
        let mut result = GenerateResult::new(text, &self.model_id, self.name()).with_tokens(
            reply["prompt_eval_count"].as_u64().unwrap_or(0),
            reply["eval_count"].as_u64().unwrap_or(0),
        );
        result.context_limit = self.context_limit;
        Ok(result)
    }

    fn parse_generate(&self, reply: &Value) -> Result<GenerateResult> {
        self.parse(reply, reply["response"].as_str())
    }

    fn parse_chat(&self, reply: &Value) -> Result<GenerateResult> {
        self.parse(reply, reply["message"]["content"].as_str())
    }
}

impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate(&self, prompt: &str, json_mode: bool) -> Result<GenerateResult> {
        let url = format!("{}/api/generate", self.base_url);
        let reply = post_json(&self.client, &url, &[], &self.generate_body(prompt, json_mode))?;
        self.parse_generate(&reply)
    }

    fn generate_with_history(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        json_mode: bool,
    ) -> Result<GenerateResult> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.chat_body(messages, system_prompt, json_mode);
        let reply = post_json(&self.client, &url, &[], &body)?;
        self.parse_chat(&reply)
    }
}
