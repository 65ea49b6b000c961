//! Shared blocking HTTP plumbing for the model clients.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use aurarouter_core::{Error, ModelConfig, Result};

const ERROR_BODY_LIMIT: usize = 300;

pub(crate) fn build_client(config: &ModelConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))
}

/// POST a JSON body and decode the JSON reply. Non-2xx is an error.
pub(crate) fn post_json(
    client: &Client,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
) -> Result<Value> {
    debug!("POST {}", redact_query(url));

    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, value);
    }

    let response = request
        .send()
        .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(Error::Provider(format!("API error {}: {}", status, body)));
    }

    response
        .json::<Value>()
        .map_err(|e| Error::Provider(format!("Malformed response: {}", e)))
}

/// Copy free-form model parameters into a request object, skipping `reserved`.
pub(crate) fn merge_parameters(target: &mut Value, parameters: &Value, reserved: &[&str]) {
    let (Some(target), Some(parameters)) = (target.as_object_mut(), parameters.as_object()) else {
        return;
    };
    for (key, value) in parameters {
        if !reserved.contains(&key.as_str()) {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Endpoint from config, else the default, without a trailing slash.
pub(crate) fn base_url(config: &ModelConfig, default: &str) -> String {
    config
        .endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// API key from config or its env fallback; required for cloud backends.
pub(crate) fn require_api_key(model_id: &str, config: &ModelConfig) -> Result<String> {
    config.resolved_api_key().ok_or_else(|| {
        Error::Config(format!(
            "Model '{}' ({}) has no API key; set api_key or api_key_env",
            model_id, config.provider
        ))
    })
}

fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
