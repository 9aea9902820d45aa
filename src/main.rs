/*!
 * feishu-notify - 命令行发送飞书通知
 *
 * 从环境变量（或 .env 文件）读取机器人凭据和接收人，
 * 发送一条消息后打印返回的 message_id。
 */

use clap::{Parser, Subcommand};
use feishu_notifier::{
    logging, BotSetup, FeishuBot, FeishuError, FeishuResult, FileType, MediaSource,
};
use std::env;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "feishu-notify")]
#[command(about = "通过飞书机器人给指定用户发送通知")]
#[command(version)]
struct Cli {
    /// 日志文件路径（默认只输出到终端）
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送文本消息
    Text {
        /// 消息内容
        message: String,
    },
    /// 发送卡片消息（markdown）
    Card {
        /// markdown 内容
        markdown: String,
        /// 卡片标题
        #[arg(long, default_value = "")]
        header: String,
    },
    /// 发送文件
    File {
        path: PathBuf,
        /// 文件类型
        #[arg(long, short = 't', value_enum, default_value_t = FileType::Stream)]
        file_type: FileType,
    },
    /// 发送图片
    Image { path: PathBuf },
    /// 发送语音（opus 格式）
    Audio { path: PathBuf },
    /// 发送视频（mp4 格式）
    Media {
        path: PathBuf,
        /// 封面图片，默认截取视频第一帧（需要 ffmpeg）
        #[arg(long)]
        cover: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> FeishuResult<()> {
    let cli = Cli::parse();

    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    logging::init_logging(&log_level, cli.log_file.as_deref())
        .map_err(|e| FeishuError::Config(format!("Failed to initialize logging: {}", e)))?;

    let config = match BotSetup::from_env() {
        BotSetup::Enabled(config) => config,
        BotSetup::Disabled { reason, .. } => return Err(FeishuError::Config(reason)),
    };
    let bot = FeishuBot::new(config)?;

    let message_id = match cli.command {
        Commands::Text { message } => bot.send_text(&message).await?,
        Commands::Card { markdown, header } => bot.send_card(&markdown, &header).await?,
        Commands::File { path, file_type } => bot.send_file(path, file_type).await?,
        Commands::Image { path } => bot.send_image(path).await?,
        Commands::Audio { path } => bot.send_audio(path).await?,
        Commands::Media { path, cover } => bot.send_media(path, cover.map(MediaSource::Path)).await?,
    };

    info!("Message sent, message_id: {:?}", message_id);
    if let Some(message_id) = message_id {
        println!("{}", message_id);
    }
    Ok(())
}
