use crate::api::{ApiClient, RawResponse, USER_ID_PATH};
use crate::config::Recipient;
use crate::error::{FeishuError, FeishuResult};
use crate::token::TokenManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default, Serialize)]
struct BatchGetIdRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobiles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BatchGetIdData {
    user_list: Option<Vec<UserInfo>>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user_id: Option<String>,
}

/// Turns the configured recipient into an open_id, once.
#[derive(Clone, Debug)]
pub struct RecipientResolver {
    recipient: Recipient,
    resolved: Arc<Mutex<Option<String>>>,
}

impl RecipientResolver {
    pub fn new(recipient: Recipient) -> Self {
        Self {
            recipient,
            resolved: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the cached open_id or looks it up. Failed lookups are not cached.
    pub async fn resolve(&self, api: &ApiClient, tokens: &TokenManager) -> FeishuResult<String> {
        let mut resolved = self.resolved.lock().await;
        if let Some(open_id) = resolved.as_ref() {
            return Ok(open_id.clone());
        }

        let open_id = match &self.recipient {
            Recipient::OpenId(open_id) => open_id.clone(),
            Recipient::Phone(phone) => {
                let body = BatchGetIdRequest {
                    mobiles: Some(vec![phone.clone()]),
                    ..Default::default()
                };
                self.lookup(api, tokens, &body).await?
            }
            Recipient::Email(email) => {
                let body = BatchGetIdRequest {
                    emails: Some(vec![email.clone()]),
                    ..Default::default()
                };
                self.lookup(api, tokens, &body).await?
            }
        };

        info!("Resolved recipient {} to open_id {}", self.recipient, open_id);
        *resolved = Some(open_id.clone());
        Ok(open_id)
    }

    pub async fn reset(&self) {
        self.resolved.lock().await.take();
    }

    async fn lookup(
        &self,
        api: &ApiClient,
        tokens: &TokenManager,
        body: &BatchGetIdRequest,
    ) -> FeishuResult<String> {
        let access_token = tokens.get_token().await?;

        debug!("Looking up Lark user by {}", self.recipient);

        let request = api
            .authorized_post(USER_ID_PATH, &access_token)
            .query(&[("user_id_type", "open_id")])
            .json(body);
        let response = RawResponse::send(request).await?;
        tokens.observe(&response).await;

        let data: Option<BatchGetIdData> =
            response.into_data("lookup user", FeishuError::Lookup)?;

        data.and_then(|data| data.user_list)
            .unwrap_or_default()
            .into_iter()
            .find_map(|user| user.user_id.filter(|id| !id.is_empty()))
            .ok_or_else(|| FeishuError::Lookup(format!("no user found for {}", self.recipient)))
    }
}
