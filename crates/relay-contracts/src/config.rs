use std::env;

use thiserror::Error;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me/v2/bot";
pub const DEFAULT_IMGUR_API_BASE: &str = "https://api.imgur.com/3";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4";
pub const DEFAULT_SYSTEM_PROMPT: &str = "用中文回答";
pub const DEFAULT_FALLBACK_REPLY: &str = "抱歉，我無法回答這個問題。";
pub const DEFAULT_VERTICAL_SPACING: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub channel_secret: Option<String>,
    pub channel_access_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub line_api_base: String,
    pub imgur_api_base: String,
    pub imgur_client_id: Option<String>,
    pub public_base_url: Option<String>,
    pub text_model: String,
    pub system_prompt: String,
    pub fallback_reply: String,
    pub stream: bool,
    pub vertical_spacing: f64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_secret: None,
            channel_access_token: None,
            openai_api_key: None,
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            line_api_base: DEFAULT_LINE_API_BASE.to_string(),
            imgur_api_base: DEFAULT_IMGUR_API_BASE.to_string(),
            imgur_client_id: None,
            public_base_url: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            stream: false,
            vertical_spacing: DEFAULT_VERTICAL_SPACING,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base = |key: &str, default: &str| {
            get(key)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };
        let defaults = Self::default();

        Self {
            channel_secret: get("CHANNEL_SECRET"),
            channel_access_token: get("CHANNEL_ACCESS_TOKEN"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: base("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE),
            line_api_base: base("LINE_API_BASE", DEFAULT_LINE_API_BASE),
            imgur_api_base: base("IMGUR_API_BASE", DEFAULT_IMGUR_API_BASE),
            imgur_client_id: get("IMGUR_CLIENT_ID"),
            public_base_url: get("RELAY_PUBLIC_URL")
                .map(|value| value.trim_end_matches('/').to_string()),
            text_model: get("RELAY_TEXT_MODEL").unwrap_or(defaults.text_model),
            system_prompt: get("RELAY_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            fallback_reply: get("RELAY_FALLBACK_REPLY").unwrap_or(defaults.fallback_reply),
            stream: get("RELAY_STREAM")
                .map(|value| parse_flag(&value))
                .unwrap_or(defaults.stream),
            vertical_spacing: defaults.vertical_spacing,
        }
    }

    pub fn validate_for_serve(&self, dry_run: bool) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.channel_secret.is_none() {
            missing.push("CHANNEL_SECRET");
        }
        if self.channel_access_token.is_none() {
            missing.push("CHANNEL_ACCESS_TOKEN");
        }
        if !dry_run && self.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
