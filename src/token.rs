use crate::api::{ApiClient, RawResponse, TENANT_TOKEN_PATH};
use crate::config::Credentials;
use crate::error::{FeishuError, FeishuResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Refresh the tenant token this long before the platform expires it.
const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    expire: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub refresh_after: Instant,
}

impl AccessToken {
    fn new(value: String, expire_secs: u64, now: Instant) -> Self {
        let lifetime = Duration::from_secs(expire_secs).saturating_sub(TOKEN_REFRESH_SKEW);
        Self {
            value,
            refresh_after: now + lifetime,
        }
    }

    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_after
    }
}

/// Owns the tenant access token. Clones share one cache.
#[derive(Clone, Debug)]
pub struct TokenManager {
    api: ApiClient,
    credentials: Credentials,
    cached: Arc<Mutex<Option<AccessToken>>>,
}

impl TokenManager {
    pub fn new(api: ApiClient, credentials: Credentials) -> Self {
        Self {
            api,
            credentials,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the cached token, fetching a new one when it is missing or
    /// about to expire. The lock is held across the refresh so concurrent
    /// callers wait for a single request.
    pub async fn get_token(&self) -> FeishuResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drops the cached token so the next `get_token` asks the platform again.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    /// Invalidates the token when a response says it was rejected.
    pub(crate) async fn observe(&self, response: &RawResponse) {
        if response.is_invalid_token() {
            warn!("Tenant access token rejected by Lark, dropping cached token");
            self.invalidate().await;
        }
    }

    async fn request_token(&self) -> FeishuResult<AccessToken> {
        if self.credentials.app_id.is_empty() || self.credentials.app_secret.is_empty() {
            return Err(FeishuError::Auth("app id or app secret is empty".to_string()));
        }

        debug!("Requesting Lark tenant access token");

        let request = self.api.post(TENANT_TOKEN_PATH).json(&AccessTokenRequest {
            app_id: &self.credentials.app_id,
            app_secret: &self.credentials.app_secret,
        });
        let response = RawResponse::send(request).await?;

        if !response.is_success() {
            error!("Failed to get access token: HTTP {}", response.status);
            return Err(FeishuError::Auth(format!(
                "HTTP {}: {}",
                response.status.as_u16(),
                response.body
            )));
        }

        let token_response: AccessTokenResponse = response.parse()?;

        if token_response.code != 0 {
            error!(
                "Lark API error: {} - {}",
                token_response.code, token_response.msg
            );
            return Err(FeishuError::Auth(format!(
                "API error: {} - {}",
                token_response.code, token_response.msg
            )));
        }

        let value = token_response
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FeishuError::Auth("No access token in response".to_string()))?;

        let expire = token_response.expire.unwrap_or(0);
        debug!("Obtained Lark access token, expires in {}s", expire);
        Ok(AccessToken::new(value, expire, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_refreshes_before_platform_expiry() {
        let now = Instant::now();
        let token = AccessToken::new("t".into(), 7200, now);
        assert_eq!(token.refresh_after, now + Duration::from_secs(7080));
    }

    #[test]
    fn short_lived_token_is_stale_immediately() {
        let now = Instant::now();
        let token = AccessToken::new("t".into(), 30, now);
        assert_eq!(token.refresh_after, now);
        assert!(!token.is_fresh());
    }
}
