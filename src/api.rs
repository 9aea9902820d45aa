use crate::config::FeishuConfig;
use crate::error::{FeishuError, FeishuResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::error;

pub const TENANT_TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
pub const USER_ID_PATH: &str = "/open-apis/contact/v3/users/batch_get_id";
pub const MESSAGE_PATH: &str = "/open-apis/im/v1/messages";
pub const UPLOAD_IMAGE_PATH: &str = "/open-apis/im/v1/images";
pub const UPLOAD_FILE_PATH: &str = "/open-apis/im/v1/files";

/// Business code returned when the tenant access token expired or was revoked.
pub const INVALID_ACCESS_TOKEN_CODE: i64 = 99_991_663;

/// Common `{code, msg, data}` envelope of the open platform.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CodeOnly {
    #[serde(default)]
    code: i64,
}

/// HTTP client bound to one platform base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &FeishuConfig) -> FeishuResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub(crate) fn authorized_post(&self, path: &str, token: &str) -> RequestBuilder {
        self.post(path)
            .header("Authorization", format!("Bearer {}", token))
    }
}

/// Status and body of a platform response, captured before interpretation so
/// failures can carry the raw body.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub async fn send(request: RequestBuilder) -> FeishuResult<Self> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn code(&self) -> Option<i64> {
        serde_json::from_str::<CodeOnly>(&self.body)
            .ok()
            .map(|c| c.code)
    }

    pub fn is_invalid_token(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
            || self.code() == Some(INVALID_ACCESS_TOKEN_CODE)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> FeishuResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Checks HTTP status and business code, returning the `data` member.
    /// `fail` wraps the description of whatever went wrong.
    pub fn into_data<T, F>(self, what: &str, fail: F) -> FeishuResult<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(String) -> FeishuError,
    {
        if !self.is_success() {
            error!("Failed to {}: HTTP {}", what, self.status);
            return Err(fail(format!("HTTP {}: {}", self.status.as_u16(), self.body)));
        }

        let response: ApiResponse<T> = match self.parse() {
            Ok(response) => response,
            Err(_) => {
                error!("Failed to {}: unreadable response body", what);
                return Err(fail(format!(
                    "HTTP {}: unreadable body: {}",
                    self.status.as_u16(),
                    self.body
                )));
            }
        };
        if response.code != 0 {
            error!("Lark API error: {} - {}", response.code, response.msg);
            return Err(fail(format!(
                "API error: {} - {}",
                response.code, response.msg
            )));
        }

        Ok(response.data)
    }
}
