/*!
 * 错误处理模块
 *
 * 定义了飞书通知客户端中所有可能出现的错误类型。
 * 配置缺失不会出现在发送路径上（客户端会进入禁用状态），
 * 其余错误全部原样返回给调用方，不做重试。
 */

use thiserror::Error;

/// 客户端结果类型的别名
///
/// 所有可能失败的操作都应该返回这个类型，统一错误处理
pub type FeishuResult<T> = Result<T, FeishuError>;

/// 客户端错误枚举
#[derive(Error, Debug)]
pub enum FeishuError {
    /// 配置错误
    /// 环境变量格式错误、取值非法等
    #[error("Configuration error: {0}")]
    Config(String),

    /// 客户端处于禁用状态，且禁用模式为 `error`
    #[error("Feishu bot is disabled: {0}")]
    Disabled(String),

    /// 获取 tenant access token 失败
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// 通过手机号或邮箱查询 open_id 失败
    #[error("Recipient lookup failed: {0}")]
    Lookup(String),

    /// 图片或文件上传失败
    #[error("Media upload failed: {0}")]
    Upload(String),

    /// 消息发送失败
    /// 保留原始 HTTP 状态码和响应体，便于排查
    #[error("Message send failed: HTTP {status}: {body}")]
    Send { status: u16, body: String },

    /// 调用参数错误
    /// 例如内存中的视频没有提供封面
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP 客户端错误
    /// 网络请求失败、超时等
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// JSON 解析错误
    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    /// 读取本地文件或执行 ffmpeg 失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeishuError {
    /// 对于发送失败，返回平台返回的 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            FeishuError::Send { status, .. } => Some(*status),
            _ => None,
        }
    }
}
