use crate::error::{FeishuError, FeishuResult};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

/// The single user that receives every notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Phone(String),
    Email(String),
    OpenId(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Recipient::Phone(phone) => write!(f, "phone:{}", phone),
            Recipient::Email(email) => write!(f, "email:{}", email),
            Recipient::OpenId(open_id) => write!(f, "open_id:{}", open_id),
        }
    }
}

/// What sends do when the bot is not configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisabledMode {
    /// Log a warning and return `Ok(None)`.
    #[default]
    Noop,
    /// Return `FeishuError::Disabled`.
    Error,
}

impl FromStr for DisabledMode {
    type Err = FeishuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "noop" => Ok(DisabledMode::Noop),
            "error" => Ok(DisabledMode::Error),
            other => Err(FeishuError::Config(format!(
                "Invalid FEISHU_DISABLED_MODE: {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FeishuConfig {
    pub credentials: Credentials,
    pub recipient: Recipient,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub disabled_mode: DisabledMode,
}

impl FeishuConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>, recipient: Recipient) -> Self {
        Self {
            credentials: Credentials {
                app_id: app_id.into(),
                app_secret: app_secret.into(),
            },
            recipient,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            disabled_mode: DisabledMode::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_disabled_mode(mut self, mode: DisabledMode) -> Self {
        self.disabled_mode = mode;
        self
    }

    pub fn from_env() -> FeishuResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_vars<F>(lookup: F) -> FeishuResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let app_id = var("FEISHU_APP_ID")
            .ok_or_else(|| FeishuError::Config("FEISHU_APP_ID is required".to_string()))?;
        let app_secret = var("FEISHU_APP_SECRET")
            .ok_or_else(|| FeishuError::Config("FEISHU_APP_SECRET is required".to_string()))?;

        // phone wins over email, email over open_id
        let recipient = var("FEISHU_PHONE")
            .map(Recipient::Phone)
            .or_else(|| var("FEISHU_EMAIL").map(Recipient::Email))
            .or_else(|| var("FEISHU_OPEN_ID").map(Recipient::OpenId))
            .ok_or_else(|| {
                FeishuError::Config(
                    "one of FEISHU_PHONE, FEISHU_EMAIL or FEISHU_OPEN_ID is required".to_string(),
                )
            })?;

        let mut config = FeishuConfig::new(app_id, app_secret, recipient)
            .with_base_url(var("FEISHU_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));

        if let Some(raw) = var("FEISHU_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| FeishuError::Config("Invalid FEISHU_TIMEOUT_SECS".to_string()))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        if let Some(raw) = var("FEISHU_DISABLED_MODE") {
            config.disabled_mode = raw.parse()?;
        }

        Ok(config)
    }
}

/// Result of validating the environment: either a usable configuration or
/// the reason the bot is switched off.
#[derive(Clone, Debug)]
pub enum BotSetup {
    Enabled(FeishuConfig),
    Disabled { reason: String, mode: DisabledMode },
}

impl BotSetup {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // an unparsable mode disables the bot below; the stand-in then uses noop
        let mode = lookup("FEISHU_DISABLED_MODE")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        match FeishuConfig::from_vars(&lookup) {
            Ok(config) => BotSetup::Enabled(config),
            Err(e) => {
                warn!("{}, feishu bot is unavailable", e);
                BotSetup::Disabled {
                    reason: e.to_string(),
                    mode,
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, BotSetup::Enabled(_))
    }
}
