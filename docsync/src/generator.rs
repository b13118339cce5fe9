//! Content generator backed by an OpenAI-compatible chat completions endpoint.

use std::env;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use docsync_core::contract::{ContentGenerator, DocKind, GatewayError, GenerationRequest};
use docsync_core::PipelineError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// `OPENAI_API_KEY` is required; `OPENAI_BASE_URL` and `OPENAI_MODEL` are optional.
    pub fn new_from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let api_key = match env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                error!("OPENAI_API_KEY missing in environment");
                return Err(PipelineError::MissingCredential {
                    name: "OPENAI_API_KEY".to_string(),
                });
            }
        };
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        info!(base_url = %base_url, model = %model, "Initialized OpenAiGenerator from environment");
        Ok(Self::new(api_key, base_url, model))
    }
}

fn system_prompt(kind: DocKind) -> &'static str {
    match kind {
        DocKind::Doc => {
            "You write developer documentation pages in MDX. Return only the complete page, \
             with a title, an explanation of what the code does and at least one fenced code \
             example. Never leave placeholders."
        }
        DocKind::Navigation => {
            "You maintain a documentation site's navigation file. Return only the complete \
             updated file, preserving its existing format and entries, with every listed \
             documentation page included."
        }
    }
}

fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!("Target file: {}\n\n", request.target_path);
    prompt.push_str("## What changed\n\n");
    prompt.push_str(&request.change_summary);
    prompt.push('\n');
    match &request.prior_content {
        Some(prior) => {
            prompt.push_str("\n## Current content (revise it, keep what is still accurate)\n\n");
            prompt.push_str(prior);
            prompt.push('\n');
        }
        None => prompt.push_str("\nThe file does not exist yet; write it from scratch.\n"),
    }
    for (i, template) in request.templates.iter().enumerate() {
        prompt.push_str(&format!("\n## Style reference {}\n\n{template}\n", i + 1));
    }
    prompt
}

/// Chat completions body for `request`. Options in the request override the default model.
pub(crate) fn completion_body(request: &GenerationRequest, default_model: &str) -> Value {
    let mut body = json!({
        "model": request.options.model.as_deref().unwrap_or(default_model),
        "messages": [
            { "role": "system", "content": system_prompt(request.kind) },
            { "role": "user", "content": user_prompt(request) },
        ],
    });
    if let Some(temperature) = request.options.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// Models like to wrap the whole answer in a single code fence; unwrap it.
pub(crate) fn strip_outer_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.split_once('\n') {
        // Another fence inside means the outer ones are not a wrapper.
        Some((_, inner)) if !inner.contains("```") => inner.trim(),
        _ => trimmed,
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = completion_body(&request, &self.model);
        debug!(path = %request.target_path, kind = ?request.kind, "Requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(%status, body = %text, "Completion request failed");
            return Err(format!("OpenAI API error ({status}): {text}").into());
        }

        let reply: Value = response.json().await?;
        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or("completion response has no message content")?;
        info!(path = %request.target_path, chars = content.len(), "Received generated content");
        Ok(strip_outer_fence(content).to_string())
    }
}
