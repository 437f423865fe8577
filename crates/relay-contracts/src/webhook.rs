use serde::{Deserialize, Serialize};

pub const MAX_TEXT_CHARS: usize = 5000;

pub const MAX_REPLY_MESSAGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub reply_token: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub source: Option<EventSource>,
    pub message: IncomingMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IncomingMessage {
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessageEvent {
    pub fn text(&self) -> Option<&str> {
        match &self.message {
            IncomingMessage::Text { text, .. } => Some(text.as_str()),
            IncomingMessage::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_content_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_image_url: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.chars().count() > MAX_TEXT_CHARS {
            text.chars().take(MAX_TEXT_CHARS).collect()
        } else {
            text
        };
        Reply::Text { text }
    }

    pub fn image(url: impl Into<String>, preview_url: impl Into<String>) -> Self {
        Reply::Image {
            original_content_url: url.into(),
            preview_image_url: preview_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub reply_token: String,
    pub messages: Vec<Reply>,
}

impl ReplyRequest {
    pub fn new(reply_token: impl Into<String>, mut messages: Vec<Reply>) -> Self {
        messages.truncate(MAX_REPLY_MESSAGES);
        Self {
            reply_token: reply_token.into(),
            messages,
        }
    }
}
