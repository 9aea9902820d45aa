use crate::api::{ApiClient, RawResponse, UPLOAD_FILE_PATH, UPLOAD_IMAGE_PATH};
use crate::error::{FeishuError, FeishuResult};
use crate::token::TokenManager;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use tokio::fs::File;
use tokio::process::Command;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

const DEFAULT_FILE_NAME: &str = "file";

/// File types accepted by the file upload endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FileType {
    Opus,
    Mp4,
    Pdf,
    Doc,
    Xls,
    Ppt,
    Stream,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Opus => "opus",
            FileType::Mp4 => "mp4",
            FileType::Pdf => "pdf",
            FileType::Doc => "doc",
            FileType::Xls => "xls",
            FileType::Ppt => "ppt",
            FileType::Stream => "stream",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = FeishuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opus" => Ok(FileType::Opus),
            "mp4" => Ok(FileType::Mp4),
            "pdf" => Ok(FileType::Pdf),
            "doc" => Ok(FileType::Doc),
            "xls" => Ok(FileType::Xls),
            "ppt" => Ok(FileType::Ppt),
            "stream" => Ok(FileType::Stream),
            other => Err(FeishuError::Validation(format!(
                "Unknown file type: {} (expected opus, mp4, pdf, doc, xls, ppt or stream)",
                other
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    File(FileType),
    /// Video, uploaded as an mp4 file.
    Media,
}

impl MediaKind {
    fn file_type(&self) -> Option<FileType> {
        match self {
            MediaKind::Image => None,
            MediaKind::File(file_type) => Some(*file_type),
            MediaKind::Media => Some(FileType::Mp4),
        }
    }
}

/// Key returned by an upload, referenced once by a message payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaHandle {
    pub kind: MediaKind,
    pub key: String,
}

/// Binary content to upload: a file on disk or bytes already in memory.
#[derive(Clone, Debug)]
pub enum MediaSource {
    Path(PathBuf),
    Bytes {
        data: Vec<u8>,
        file_name: Option<String>,
    },
}

impl MediaSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        MediaSource::Path(path.into())
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        MediaSource::Bytes {
            data: data.into(),
            file_name: None,
        }
    }

    pub fn named_bytes(data: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        MediaSource::Bytes {
            data: data.into(),
            file_name: Some(file_name.into()),
        }
    }

    pub fn file_name(&self) -> String {
        let name = match self {
            MediaSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            MediaSource::Bytes { file_name, .. } => file_name.clone(),
        };
        name.filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            MediaSource::Path(path) => Some(path),
            MediaSource::Bytes { .. } => None,
        }
    }

    /// Loads the whole content. Uploads stream path sources instead.
    pub async fn read(&self) -> FeishuResult<Vec<u8>> {
        match self {
            MediaSource::Path(path) => Ok(tokio::fs::read(path).await?),
            MediaSource::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

impl From<PathBuf> for MediaSource {
    fn from(path: PathBuf) -> Self {
        MediaSource::Path(path)
    }
}

impl From<&Path> for MediaSource {
    fn from(path: &Path) -> Self {
        MediaSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for MediaSource {
    fn from(data: Vec<u8>) -> Self {
        MediaSource::bytes(data)
    }
}

impl From<&[u8]> for MediaSource {
    fn from(data: &[u8]) -> Self {
        MediaSource::bytes(data.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct UploadData {
    image_key: Option<String>,
    file_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MediaUploader {
    api: ApiClient,
    tokens: TokenManager,
}

impl MediaUploader {
    pub fn new(api: ApiClient, tokens: TokenManager) -> Self {
        Self { api, tokens }
    }

    /// Uploads the content and returns its image_key or file_key. The
    /// platform validates size and format.
    pub async fn upload(&self, source: &MediaSource, kind: MediaKind) -> FeishuResult<MediaHandle> {
        let file_name = source.file_name();
        // files are opened before the token so a missing file costs no request
        let (part, len) = match source {
            MediaSource::Path(path) => {
                let file = File::open(path).await?;
                let len = file.metadata().await?.len();
                let body = Body::wrap_stream(ReaderStream::new(file));
                (Part::stream_with_length(body, len), len)
            }
            MediaSource::Bytes { data, .. } => (Part::bytes(data.clone()), data.len() as u64),
        };
        let part = part.file_name(file_name.clone());
        let access_token = self.tokens.get_token().await?;

        debug!(
            "Uploading {} bytes as {:?} (file name: {})",
            len, kind, file_name
        );

        let (path, form) = match kind.file_type() {
            None => (
                UPLOAD_IMAGE_PATH,
                Form::new().text("image_type", "message").part("image", part),
            ),
            Some(file_type) => (
                UPLOAD_FILE_PATH,
                Form::new()
                    .text("file_type", file_type.as_str())
                    .text("file_name", file_name)
                    .part("file", part),
            ),
        };

        let request = self.api.authorized_post(path, &access_token).multipart(form);
        let response = RawResponse::send(request).await?;
        self.tokens.observe(&response).await;

        let data: Option<UploadData> = response.into_data("upload media", FeishuError::Upload)?;
        let key = data.and_then(|d| match kind {
            MediaKind::Image => d.image_key,
            _ => d.file_key,
        });

        match key {
            Some(key) if !key.is_empty() => {
                info!("Uploaded {:?}, key: {}", kind, key);
                Ok(MediaHandle { kind, key })
            }
            _ => {
                error!("Upload response for {:?} carried no key", kind);
                Err(FeishuError::Upload("No media key in response".to_string()))
            }
        }
    }
}

/// Grabs the first video frame as JPEG using `ffmpeg`.
pub async fn extract_cover(video: &Path) -> FeishuResult<Vec<u8>> {
    debug!("Extracting cover frame from {}", video.display());

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(video)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => FeishuError::Validation(
                "ffmpeg is not installed, pass a cover image explicitly".to_string(),
            ),
            _ => FeishuError::Io(e),
        })?;

    if !output.status.success() || output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("ffmpeg failed on {}: {}", video.display(), stderr.trim());
        return Err(FeishuError::Validation(format!(
            "could not extract a cover frame from {}",
            video.display()
        )));
    }

    Ok(output.stdout)
}
