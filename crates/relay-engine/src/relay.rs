use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use relay_contracts::bracket::{build_with, Bracket, LayoutOptions};
use relay_contracts::chat::{parse_intent, Intent, CHAT_HELP_TEXT};
use relay_contracts::config::RelayConfig;
use relay_contracts::webhook::{MessageEvent, Reply, ReplyRequest, WebhookBody, WebhookEvent};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::http::error_chain_text;
use crate::{
    BracketRenderer, ChatModel, DryrunChatModel, HostedImage, ImageHost, ImgurHost,
    LineMessagingClient, LineSignatureVerifier, LocalImageHost, MessagingTransport,
    OpenAiChatModel, RasterRenderer, SignatureVerifier,
};

pub const BRACKET_FAILURE_REPLY: &str = "Sorry, the bracket image could not be created.";
pub const BRACKET_UNAVAILABLE_REPLY: &str = "Bracket images are not enabled on this bot.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("malformed webhook body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub events: usize,
    pub replied: usize,
    pub ignored: usize,
    pub failed: usize,
}

pub struct Relay {
    config: RelayConfig,
    verifier: Box<dyn SignatureVerifier>,
    chat: Box<dyn ChatModel>,
    renderer: Box<dyn BracketRenderer>,
    images: Option<Box<dyn ImageHost>>,
    transport: Box<dyn MessagingTransport>,
}

impl Relay {
    pub fn new<V, C, R, T>(
        config: RelayConfig,
        verifier: V,
        chat: C,
        renderer: R,
        transport: T,
    ) -> Self
    where
        V: SignatureVerifier + 'static,
        C: ChatModel + 'static,
        R: BracketRenderer + 'static,
        T: MessagingTransport + 'static,
    {
        Self {
            config,
            verifier: Box::new(verifier),
            chat: Box::new(chat),
            renderer: Box::new(renderer),
            images: None,
            transport: Box::new(transport),
        }
    }

    pub fn with_image_host<H: ImageHost + 'static>(mut self, host: H) -> Self {
        self.images = Some(Box::new(host));
        self
    }

    /// Wires the production collaborators. An Imgur client id wins over a
    /// local image directory; with neither, bracket requests get a text reply.
    pub fn from_config(
        config: RelayConfig,
        dry_run: bool,
        images_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let secret = config
            .channel_secret
            .clone()
            .ok_or_else(|| anyhow!("CHANNEL_SECRET is not set"))?;
        let verifier = LineSignatureVerifier::new(secret);
        let transport = LineMessagingClient::from_config(&config)?;
        let renderer = RasterRenderer::default();

        let relay = if dry_run {
            Relay::new(config, verifier, DryrunChatModel, renderer, transport)
        } else {
            let chat = OpenAiChatModel::from_config(&config)?;
            Relay::new(config, verifier, chat, renderer, transport)
        };

        let relay = match (
            relay.config.imgur_client_id.clone(),
            images_dir,
            relay.config.public_base_url.clone(),
        ) {
            (Some(client_id), _, _) => {
                let host = ImgurHost::new(&relay.config.imgur_api_base, client_id)?;
                relay.with_image_host(host)
            }
            (None, Some(dir), Some(public_base)) => {
                relay.with_image_host(LocalImageHost::new(dir, public_base)?)
            }
            (None, Some(_), None) => {
                warn!("images directory given without RELAY_PUBLIC_URL; bracket images disabled");
                relay
            }
            (None, None, _) => {
                warn!("no image host configured; bracket images disabled");
                relay
            }
        };
        info!(
            chat = relay.chat.name(),
            images = relay.image_host_name().unwrap_or("none"),
            "relay ready"
        );
        Ok(relay)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn image_host_name(&self) -> Option<&str> {
        self.images.as_deref().map(|host| host.name())
    }

    pub fn handle_webhook(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, RelayError> {
        let span = info_span!("webhook", request_id = %request_id(body));
        let _entered = span.enter();
        debug!(body = %String::from_utf8_lossy(body), "webhook received");

        self.verifier.verify(body, signature).map_err(|err| {
            let reason = error_chain_text(&err, 256);
            warn!(%reason, "rejected webhook");
            RelayError::InvalidSignature(reason)
        })?;
        let parsed: WebhookBody = serde_json::from_slice(body)?;

        let mut outcome = WebhookOutcome {
            events: parsed.events.len(),
            ..WebhookOutcome::default()
        };
        for event in &parsed.events {
            match event {
                WebhookEvent::Message(message) => self.handle_message(message, &mut outcome),
                WebhookEvent::Other => outcome.ignored += 1,
            }
        }
        info!(
            events = outcome.events,
            replied = outcome.replied,
            ignored = outcome.ignored,
            failed = outcome.failed,
            "webhook handled"
        );
        Ok(outcome)
    }

    fn handle_message(&self, event: &MessageEvent, outcome: &mut WebhookOutcome) {
        let (Some(text), Some(reply_token)) = (event.text(), event.reply_token.as_deref()) else {
            outcome.ignored += 1;
            return;
        };
        let Some(replies) = self.respond(&parse_intent(text)) else {
            outcome.ignored += 1;
            return;
        };
        let request = ReplyRequest::new(reply_token, replies);
        match self.transport.reply(&request) {
            Ok(()) => outcome.replied += 1,
            Err(err) => {
                error!(error = %error_chain_text(&err, 512), "reply failed");
                outcome.failed += 1;
            }
        }
    }

    pub fn respond(&self, intent: &Intent) -> Option<Vec<Reply>> {
        match intent {
            Intent::Noop => None,
            Intent::Help => Some(vec![Reply::text(CHAT_HELP_TEXT)]),
            Intent::Chat { prompt } => Some(vec![self.chat_reply(prompt)]),
            Intent::Bracket { participants } => Some(self.bracket_replies(*participants)),
            Intent::InvalidBracket { reason } => Some(vec![Reply::text(reason.clone())]),
        }
    }

    fn chat_reply(&self, prompt: &str) -> Reply {
        match self.chat.complete(&self.config.system_prompt, prompt) {
            Ok(text) => Reply::text(text),
            Err(err) => {
                error!(
                    chat = self.chat.name(),
                    error = %error_chain_text(&err, 512),
                    "completion failed"
                );
                Reply::text(self.config.fallback_reply.clone())
            }
        }
    }

    fn bracket_replies(&self, participants: i64) -> Vec<Reply> {
        let Some(host) = self.images.as_deref() else {
            return vec![Reply::text(BRACKET_UNAVAILABLE_REPLY)];
        };
        let options = LayoutOptions::new(self.config.vertical_spacing).with_byes();
        let bracket = match build_with(participants, options) {
            Ok(bracket) => bracket,
            Err(err) => return vec![Reply::text(err.to_string())],
        };
        match self.publish_bracket(&bracket, host) {
            Ok(hosted) => vec![
                Reply::text(bracket_caption(&bracket)),
                Reply::image(hosted.url, hosted.preview_url),
            ],
            Err(err) => {
                error!(error = %error_chain_text(&err, 512), "bracket publish failed");
                vec![Reply::text(BRACKET_FAILURE_REPLY)]
            }
        }
    }

    fn publish_bracket(&self, bracket: &Bracket, host: &dyn ImageHost) -> Result<HostedImage> {
        let png = self
            .renderer
            .render(bracket)
            .context("bracket render failed")?;
        let file_name = format!(
            "bracket-{}-{}.png",
            bracket.participants(),
            Uuid::new_v4().simple()
        );
        let hosted = host
            .upload(&png, &file_name)
            .with_context(|| format!("{} upload failed", host.name()))?;
        debug!(url = %hosted.url, bytes = png.len(), "bracket uploaded");
        Ok(hosted)
    }
}

fn bracket_caption(bracket: &Bracket) -> String {
    let byes: usize = bracket.rounds().iter().map(|round| round.byes).sum();
    let mut caption = format!(
        "{}, {}",
        counted(bracket.participants(), "player"),
        counted(bracket.round_count() as usize, "round")
    );
    if byes > 0 {
        caption.push_str(&format!(", {}", counted(byes, "bye")));
    }
    caption
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn request_id(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    hex::encode(&digest[..4])
}
