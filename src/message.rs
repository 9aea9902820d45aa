use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Image,
    File,
    Audio,
    Media,
    Interactive,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::Text => "text",
            MsgType::Image => "image",
            MsgType::File => "file",
            MsgType::Audio => "audio",
            MsgType::Media => "media",
            MsgType::Interactive => "interactive",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message, built per call and never stored.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageContent {
    Text { text: String },
    Image { image_key: String },
    File { file_key: String },
    Audio { file_key: String },
    Media { file_key: String, image_key: String },
    Interactive(Value),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text { text: text.into() }
    }

    /// Card with a single markdown block. The header is omitted when empty.
    pub fn card(markdown: &str, header: &str) -> Self {
        let mut card = json!({
            "config": { "wide_screen_mode": true },
            "elements": [{ "tag": "markdown", "content": markdown }],
        });
        if !header.is_empty() {
            card["header"] = json!({
                "title": { "tag": "plain_text", "content": header },
                "template": "blue",
            });
        }
        MessageContent::Interactive(card)
    }

    pub fn msg_type(&self) -> MsgType {
        match self {
            MessageContent::Text { .. } => MsgType::Text,
            MessageContent::Image { .. } => MsgType::Image,
            MessageContent::File { .. } => MsgType::File,
            MessageContent::Audio { .. } => MsgType::Audio,
            MessageContent::Media { .. } => MsgType::Media,
            MessageContent::Interactive(_) => MsgType::Interactive,
        }
    }

    pub fn content(&self) -> Value {
        match self {
            MessageContent::Text { text } => json!({ "text": text }),
            MessageContent::Image { image_key } => json!({ "image_key": image_key }),
            MessageContent::File { file_key } | MessageContent::Audio { file_key } => {
                json!({ "file_key": file_key })
            }
            MessageContent::Media { file_key, image_key } => {
                json!({ "file_key": file_key, "image_key": image_key })
            }
            MessageContent::Interactive(card) => card.clone(),
        }
    }

    /// Request body for the message endpoint. `content` is a JSON string.
    pub(crate) fn to_request(&self, receive_id: &str) -> SendMessageRequest {
        SendMessageRequest {
            receive_id: receive_id.to_string(),
            msg_type: self.msg_type().as_str().to_string(),
            content: self.content().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest {
    pub receive_id: String,
    pub msg_type: String,
    pub content: String,
}
