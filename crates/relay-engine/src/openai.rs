use std::io::{BufRead, BufReader};

use anyhow::{anyhow, bail, Context, Result};
use relay_contracts::config::RelayConfig;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{json, Value};
use tracing::debug;

use crate::http::{ensure_success, http_client, response_json_or_error};
use crate::ChatModel;

pub struct OpenAiChatModel {
    api_base: String,
    api_key: String,
    model: String,
    stream: bool,
    http: HttpClient,
}

impl OpenAiChatModel {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            stream: false,
            http: http_client()?,
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;
        let model = Self::new(&config.openai_api_base, api_key, &config.text_model)?;
        Ok(model.with_stream(config.stream))
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    fn payload(&self, system: &str, user: &str) -> Value {
        let mut messages = Vec::new();
        if !system.trim().is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": user}));
        json!({
            "model": self.model,
            "messages": messages,
            "stream": self.stream,
        })
    }

    fn complete_once(&self, endpoint: &str, payload: &Value) -> Result<String> {
        let response = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .context("OpenAI request failed")?;
        let body = response_json_or_error("OpenAI", response)?;
        extract_message_content(&body)
    }

    fn complete_streamed(&self, endpoint: &str, payload: &Value) -> Result<String> {
        let response = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "text/event-stream")
            .json(payload)
            .send()
            .context("OpenAI stream request failed")?;
        let response = ensure_success("OpenAI", response)?;
        accumulate_stream(BufReader::new(response))
    }
}

impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.api_base);
        let payload = self.payload(system, user);
        debug!(model = %self.model, stream = self.stream, "requesting completion");
        let text = if self.stream {
            self.complete_streamed(&endpoint, &payload)?
        } else {
            self.complete_once(&endpoint, &payload)?
        };
        if text.trim().is_empty() {
            bail!("OpenAI returned an empty completion");
        }
        Ok(text)
    }
}

pub struct DryrunChatModel;

impl ChatModel for DryrunChatModel {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn complete(&self, _system: &str, user: &str) -> Result<String> {
        Ok(format!("[dryrun] {}", user.trim()))
    }
}

fn extract_message_content(body: &Value) -> Result<String> {
    body.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("OpenAI response has no message content"))
}

/// Reads a server-sent event stream and concatenates every content delta.
fn accumulate_stream<R: BufRead>(reader: R) -> Result<String> {
    let mut text = String::new();
    for line in reader.lines() {
        let line = line.context("OpenAI stream read failed")?;
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            break;
        }
        let chunk: Value =
            serde_json::from_str(data).context("OpenAI stream chunk is not valid JSON")?;
        if let Some(error) = chunk.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("OpenAI stream error: {message}");
        }
        let delta = chunk
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.pointer("/delta/content"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        text.push_str(delta);
    }
    Ok(text)
}
