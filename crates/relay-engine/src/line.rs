use anyhow::{anyhow, Context, Result};
use relay_contracts::config::RelayConfig;
use relay_contracts::webhook::ReplyRequest;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::AUTHORIZATION;

use crate::http::{ensure_success, http_client};
use crate::MessagingTransport;

pub struct LineMessagingClient {
    api_base: String,
    access_token: String,
    http: HttpClient,
}

impl LineMessagingClient {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            http: http_client()?,
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let token = config
            .channel_access_token
            .clone()
            .ok_or_else(|| anyhow!("CHANNEL_ACCESS_TOKEN is not set"))?;
        Self::new(&config.line_api_base, token)
    }

    fn reply_endpoint(&self) -> String {
        format!("{}/message/reply", self.api_base)
    }
}

impl MessagingTransport for LineMessagingClient {
    fn reply(&self, request: &ReplyRequest) -> Result<()> {
        let response = self
            .http
            .post(self.reply_endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(request)
            .send()
            .context("LINE reply request failed")?;
        ensure_success("LINE", response)?;
        Ok(())
    }
}
