pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod message;
pub mod recipient;
pub mod token;

pub use client::{FeishuBot, Notifier};
pub use config::{BotSetup, DisabledMode, FeishuConfig, Recipient};
pub use error::{FeishuError, FeishuResult};
pub use media::{FileType, MediaKind, MediaSource};
pub use message::MessageContent;
