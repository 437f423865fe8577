use anyhow::Result;
use relay_contracts::bracket::Bracket;
use relay_contracts::webhook::ReplyRequest;

mod hosting;
mod http;
mod line;
mod openai;
mod relay;
mod render;
mod signature;

pub use hosting::{ImgurHost, LocalImageHost};
pub use line::LineMessagingClient;
pub use openai::{DryrunChatModel, OpenAiChatModel};
pub use relay::{Relay, RelayError, WebhookOutcome};
pub use render::RasterRenderer;
pub use signature::LineSignatureVerifier;

pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, body: &[u8], signature: &str) -> Result<()>;
}

pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

pub trait BracketRenderer: Send + Sync {
    fn render(&self, bracket: &Bracket) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub preview_url: String,
}

pub trait ImageHost: Send + Sync {
    fn name(&self) -> &str;
    fn upload(&self, png: &[u8], file_name: &str) -> Result<HostedImage>;
}

pub trait MessagingTransport: Send + Sync {
    fn reply(&self, request: &ReplyRequest) -> Result<()>;
}
