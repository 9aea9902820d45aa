/*!
 * 飞书机器人客户端
 *
 * 每个发送方法的流程相同：
 * - 确保 tenant access token 有效（过期自动刷新）
 * - 确保接收人 open_id 已解析（首次解析后缓存）
 * - 需要时先上传图片或文件，拿到 media key
 * - 构造消息体并调用消息发送接口
 *
 * `Notifier` 在此之上区分启用和禁用两种状态，禁用时不发出任何 HTTP 请求。
 */

use crate::api::{ApiClient, ApiResponse, RawResponse, MESSAGE_PATH};
use crate::config::{BotSetup, DisabledMode, FeishuConfig};
use crate::error::{FeishuError, FeishuResult};
use crate::media::{extract_cover, FileType, MediaKind, MediaSource, MediaUploader};
use crate::message::MessageContent;
use crate::recipient::RecipientResolver;
use crate::token::TokenManager;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
struct SendMessageData {
    message_id: Option<String>,
}

/// Client for one bot and one recipient. Clones share the token and
/// recipient caches.
#[derive(Clone, Debug)]
pub struct FeishuBot {
    api: ApiClient,
    tokens: TokenManager,
    recipient: RecipientResolver,
    uploader: MediaUploader,
}

impl FeishuBot {
    pub fn new(config: FeishuConfig) -> FeishuResult<Self> {
        let api = ApiClient::from_config(&config)?;
        let tokens = TokenManager::new(api.clone(), config.credentials);
        let recipient = RecipientResolver::new(config.recipient);
        let uploader = MediaUploader::new(api.clone(), tokens.clone());
        Ok(Self {
            api,
            tokens,
            recipient,
            uploader,
        })
    }

    /// Resolved open_id of the recipient.
    pub async fn open_id(&self) -> FeishuResult<String> {
        self.recipient.resolve(&self.api, &self.tokens).await
    }

    /// Forgets the cached token and open_id.
    pub async fn reset_caches(&self) {
        self.tokens.invalidate().await;
        self.recipient.reset().await;
    }

    pub async fn send_text(&self, text: &str) -> FeishuResult<Option<String>> {
        debug!("Message content length: {} characters", text.len());
        self.send(&MessageContent::text(text)).await
    }

    pub async fn send_card(&self, markdown: &str, header: &str) -> FeishuResult<Option<String>> {
        self.send(&MessageContent::card(markdown, header)).await
    }

    pub async fn send_image(&self, image: impl Into<MediaSource>) -> FeishuResult<Option<String>> {
        self.open_id().await?;
        let handle = self.uploader.upload(&image.into(), MediaKind::Image).await?;
        self.send(&MessageContent::Image {
            image_key: handle.key,
        })
        .await
    }

    pub async fn send_file(
        &self,
        file: impl Into<MediaSource>,
        file_type: FileType,
    ) -> FeishuResult<Option<String>> {
        self.open_id().await?;
        let handle = self
            .uploader
            .upload(&file.into(), MediaKind::File(file_type))
            .await?;
        self.send(&MessageContent::File {
            file_key: handle.key,
        })
        .await
    }

    /// Audio must already be opus encoded, e.g.
    /// `ffmpeg -i in.mp3 -acodec libopus -ac 1 -ar 16000 out.opus`.
    pub async fn send_audio(&self, audio: impl Into<MediaSource>) -> FeishuResult<Option<String>> {
        self.open_id().await?;
        let handle = self
            .uploader
            .upload(&audio.into(), MediaKind::File(FileType::Opus))
            .await?;
        self.send(&MessageContent::Audio {
            file_key: handle.key,
        })
        .await
    }

    /// Sends an mp4 video. Without an explicit cover the first frame of the
    /// video file is used, which requires the video to be a path on disk.
    pub async fn send_media(
        &self,
        media: impl Into<MediaSource>,
        cover: Option<MediaSource>,
    ) -> FeishuResult<Option<String>> {
        let media = media.into();
        // covers are loaded before any upload so a bad cover costs no request
        let cover = match cover {
            Some(cover @ MediaSource::Bytes { .. }) => cover,
            Some(cover) => MediaSource::named_bytes(cover.read().await?, cover.file_name()),
            None => {
                let path = media.as_path().ok_or_else(|| {
                    FeishuError::Validation(
                        "cover must be set when media is not a file on disk".to_string(),
                    )
                })?;
                MediaSource::named_bytes(extract_cover(path).await?, "cover.jpg")
            }
        };

        self.open_id().await?;
        let video = self.uploader.upload(&media, MediaKind::Media).await?;
        let image = self.uploader.upload(&cover, MediaKind::Image).await?;

        self.send(&MessageContent::Media {
            file_key: video.key,
            image_key: image.key,
        })
        .await
    }

    /// Posts a built message to the recipient and returns the message id.
    pub async fn send(&self, message: &MessageContent) -> FeishuResult<Option<String>> {
        let access_token = self.tokens.get_token().await?;
        let open_id = self.open_id().await?;

        info!("Sending {} message to Lark user: {}", message.msg_type(), open_id);

        let request = self
            .api
            .authorized_post(MESSAGE_PATH, &access_token)
            .query(&[("receive_id_type", "open_id")])
            .json(&message.to_request(&open_id));
        let response = RawResponse::send(request).await?;
        self.tokens.observe(&response).await;

        if !response.is_success() {
            error!("Failed to send message: HTTP {}", response.status);
            return Err(FeishuError::Send {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let message_response: ApiResponse<SendMessageData> = match response.parse() {
            Ok(message_response) => message_response,
            Err(_) => {
                error!("Failed to send message: unreadable response body");
                return Err(FeishuError::Send {
                    status: response.status.as_u16(),
                    body: response.body,
                });
            }
        };

        if message_response.code != 0 {
            error!(
                "Lark API error: {} - {}",
                message_response.code, message_response.msg
            );
            return Err(FeishuError::Send {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let message_id = message_response.data.and_then(|data| data.message_id);

        info!(
            "Successfully sent message to user: {}, message_id: {:?}",
            open_id, message_id
        );
        Ok(message_id)
    }
}

/// Entry point for callers: a working bot, or a stand-in that issues no
/// requests because configuration was incomplete.
#[derive(Clone, Debug)]
pub enum Notifier {
    Enabled(FeishuBot),
    Disabled { reason: String, mode: DisabledMode },
}

impl Notifier {
    pub fn from_env() -> Self {
        Self::from_setup(BotSetup::from_env())
    }

    pub fn from_setup(setup: BotSetup) -> Self {
        match setup {
            BotSetup::Enabled(config) => {
                let mode = config.disabled_mode;
                match FeishuBot::new(config) {
                    Ok(bot) => Notifier::Enabled(bot),
                    Err(e) => {
                        warn!("{}, feishu bot is unavailable", e);
                        Notifier::Disabled {
                            reason: e.to_string(),
                            mode,
                        }
                    }
                }
            }
            BotSetup::Disabled { reason, mode } => Notifier::Disabled { reason, mode },
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Notifier::Enabled(_))
    }

    pub fn bot(&self) -> Option<&FeishuBot> {
        match self {
            Notifier::Enabled(bot) => Some(bot),
            Notifier::Disabled { .. } => None,
        }
    }

    pub async fn send_text(&self, text: &str) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_text(text).await,
            Notifier::Disabled { reason, mode } => skip("send_text", reason, *mode),
        }
    }

    pub async fn send_card(&self, markdown: &str, header: &str) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_card(markdown, header).await,
            Notifier::Disabled { reason, mode } => skip("send_card", reason, *mode),
        }
    }

    pub async fn send_image(&self, image: impl Into<MediaSource>) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_image(image).await,
            Notifier::Disabled { reason, mode } => skip("send_image", reason, *mode),
        }
    }

    pub async fn send_file(
        &self,
        file: impl Into<MediaSource>,
        file_type: FileType,
    ) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_file(file, file_type).await,
            Notifier::Disabled { reason, mode } => skip("send_file", reason, *mode),
        }
    }

    pub async fn send_audio(&self, audio: impl Into<MediaSource>) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_audio(audio).await,
            Notifier::Disabled { reason, mode } => skip("send_audio", reason, *mode),
        }
    }

    pub async fn send_media(
        &self,
        media: impl Into<MediaSource>,
        cover: Option<MediaSource>,
    ) -> FeishuResult<Option<String>> {
        match self {
            Notifier::Enabled(bot) => bot.send_media(media, cover).await,
            Notifier::Disabled { reason, mode } => skip("send_media", reason, *mode),
        }
    }
}

fn skip(operation: &str, reason: &str, mode: DisabledMode) -> FeishuResult<Option<String>> {
    match mode {
        DisabledMode::Noop => {
            warn!("FeishuBot is disabled, {} is unavailable", operation);
            Ok(None)
        }
        DisabledMode::Error => Err(FeishuError::Disabled(reason.to_string())),
    }
}
