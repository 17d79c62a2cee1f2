//! 转录模块
//!
//! 语音识别引擎通过 [`Transcriber`] 接入，进程内只保留一个实例，首次使用时初始化。

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{KaraokeError, Result},
    model::verse::{Verse, round_to_centis, save_verses},
    subtitle::{
        RAW_LYRICS_FILE_NAME,
        processors::verse_filter::{VerseFilterOptions, filter_verses},
    },
};

/// 语音活动检测的参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadOptions {
    /// 是否启用
    pub enabled: bool,
    /// 视为停顿的最短静音（毫秒）
    pub min_silence_duration_ms: u32,
    /// 语音两端保留的填充（毫秒）
    pub speech_pad_ms: u32,
    /// 判定为语音的阈值
    pub threshold: f32,
}

impl Default for VadOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_silence_duration_ms: 800,
            speech_pad_ms: 25,
            threshold: 0.6,
        }
    }
}

/// 转录参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionOptions {
    /// 语言代码，`None` 表示自动检测
    pub language: Option<String>,
    /// 集束搜索宽度
    pub beam_size: u32,
    /// 采样候选数
    pub best_of: u32,
    /// 集束搜索的耐心系数
    pub patience: f32,
    /// 是否以前文作为提示
    pub condition_on_previous_text: bool,
    /// 压缩率阈值
    pub compression_ratio_threshold: f32,
    /// 采样温度
    pub temperature: f32,
    /// 是否输出单词级时间
    pub word_timestamps: bool,
    /// 语音活动检测
    pub vad: VadOptions,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            language: None,
            beam_size: 15,
            best_of: 5,
            patience: 3.0,
            condition_on_previous_text: false,
            compression_ratio_threshold: 1.3,
            temperature: 0.0,
            word_timestamps: true,
            vad: VadOptions::default(),
        }
    }
}

/// 语音识别引擎需要实现的接口。
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// 引擎名称。
    fn name(&self) -> &'static str;

    /// 转录音频文件，返回带单词级时间的歌词。
    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscriptionOptions,
    ) -> Result<Vec<Verse>>;
}

static TRANSCRIBER: OnceLock<Arc<dyn Transcriber>> = OnceLock::new();

/// 安装进程内的转录器。已经安装过时返回错误。
pub fn install_transcriber(transcriber: Arc<dyn Transcriber>) -> Result<()> {
    let name = transcriber.name();
    TRANSCRIBER.set(transcriber).map_err(|_| {
        let installed = TRANSCRIBER.get().map_or("未知", |t| t.name());
        KaraokeError::Transcription(format!("转录器已安装 ({installed})，无法再安装 {name}"))
    })?;
    info!("已安装转录器: {}", name);
    Ok(())
}

/// 返回已安装的转录器，没有时用 `factory` 创建并安装。
pub fn transcriber_or_init<F>(factory: F) -> Arc<dyn Transcriber>
where
    F: FnOnce() -> Arc<dyn Transcriber>,
{
    TRANSCRIBER
        .get_or_init(|| {
            let transcriber = factory();
            info!("已初始化转录器: {}", transcriber.name());
            transcriber
        })
        .clone()
}

/// 返回已安装的转录器。
#[must_use]
pub fn transcriber() -> Option<Arc<dyn Transcriber>> {
    TRANSCRIBER.get().cloned()
}

/// 使用进程内的转录器提取歌词，写入 `raw_lyrics.json`。
pub async fn extract_lyrics(
    working_dir: &Path,
    audio: &Path,
    options: &TranscriptionOptions,
    filter_options: &VerseFilterOptions,
) -> Result<Vec<Verse>> {
    let transcriber =
        transcriber().ok_or_else(|| KaraokeError::Transcription("尚未安装转录器".to_string()))?;
    extract_lyrics_with(
        transcriber.as_ref(),
        working_dir,
        audio,
        options,
        filter_options,
    )
    .await
}

/// 使用指定的转录器提取歌词：转录、时间取两位小数、依次过滤，然后写入 `raw_lyrics.json`。
pub async fn extract_lyrics_with(
    transcriber: &dyn Transcriber,
    working_dir: &Path,
    audio: &Path,
    options: &TranscriptionOptions,
    filter_options: &VerseFilterOptions,
) -> Result<Vec<Verse>> {
    info!("使用 {} 转录 {:?}", transcriber.name(), audio);
    let mut verses = transcriber.transcribe(audio, options).await?;
    info!("转录得到 {} 句歌词", verses.len());

    for verse in &mut verses {
        verse.start = round_to_centis(verse.start);
        verse.end = round_to_centis(verse.end);
        for word in &mut verse.words {
            word.start = round_to_centis(word.start);
            word.end = round_to_centis(word.end);
        }
    }

    let verses = filter_verses(verses, filter_options);

    let output: PathBuf = working_dir.join(RAW_LYRICS_FILE_NAME);
    save_verses(&output, &verses)?;
    info!("歌词已保存到 {:?}", output);

    Ok(verses)
}
