//! 定义了整个 `karaoke-helper` 库的错误类型 `KaraokeError`。

use std::{fmt, io, path::PathBuf};
use thiserror::Error;

use crate::subtitle::types::SubtitleError;

/// `karaoke-helper` 库的通用错误枚举。
#[derive(Error, Debug)]
pub enum KaraokeError {
    /// 通用的 anyhow 错误
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    /// JSON 解析失败 (源自 `serde_json::Error`)
    #[error("JSON 解析失败: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// 字符串格式化错误
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),

    /// I/O 错误 (源自 `io::Error`)
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    /// 字幕解析失败
    #[error("字幕解析失败: {0}")]
    Parser(String),

    /// 工作目录中没有歌词文件
    #[error("在 {0} 中未找到歌词文件 (modified_lyrics.json 或 raw_lyrics.json)")]
    LyricsNotFound(PathBuf),

    /// 无法获取音频时长
    #[error("无法获取音频 {0} 的时长")]
    AudioDuration(PathBuf),

    /// 媒体文件不存在、为空或不可读
    #[error("媒体文件 {path} 无效: {reason}")]
    InvalidMedia {
        /// 出问题的文件
        path: PathBuf,
        /// 原因
        reason: String,
    },

    /// 编码器以非零状态退出
    #[error("编码器执行失败 ({status}): {command}")]
    Encoder {
        /// 完整的命令行
        command: String,
        /// 退出状态
        status: String,
    },

    /// 同一工作目录上已有任务在运行
    #[error("工作目录 {0} 上已有任务在运行")]
    WorkdirBusy(PathBuf),

    /// 转录失败
    #[error("转录失败: {0}")]
    Transcription(String),

    /// 外部编辑器执行失败或返回了无效内容
    #[error("编辑器错误: {0}")]
    Editor(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// `KaraokeError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, KaraokeError>;

impl From<SubtitleError> for KaraokeError {
    fn from(err: SubtitleError) -> Self {
        match err {
            SubtitleError::Io(e) => Self::Io(e),

            SubtitleError::JsonParse { source, context } => {
                let error_message = format!("解析 JSON 内容 {context} 失败: {source}");
                Self::Parser(error_message)
            }

            SubtitleError::Format(e) => Self::Format(e),
        }
    }
}
