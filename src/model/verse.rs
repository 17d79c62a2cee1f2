//! 带时间信息的歌词数据模型，以及 JSON 歌词库的读写。
//!
//! JSON 格式为 `[{start, end, words: [{word, start, end}]}]`。
//! 读取时逐条校验，损坏的记录会被跳过而不会让整个文件加载失败。

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::subtitle::types::SubtitleError;

/// verse 开始时间与首个单词开始时间允许的偏差（秒）。
const START_MISMATCH_TOLERANCE: f64 = 0.05;

/// 一个带时间戳的单词。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Word {
    /// 单词文本
    #[serde(rename = "word")]
    pub text: String,
    /// 开始时间（秒）
    pub start: f64,
    /// 结束时间（秒）
    pub end: f64,
    /// 可选的原始显示文本，存在时优先用于显示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Word {
    /// 创建一个新的单词。
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            raw: None,
        }
    }

    /// 返回用于显示的文本。
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.raw.as_deref().unwrap_or(&self.text)
    }

    /// 单词的时长（秒），不会为负。
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// 一句转录出的歌词。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Verse {
    /// 开始时间（秒）
    pub start: f64,
    /// 结束时间（秒）
    pub end: f64,
    /// 组成该句的单词
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Verse {
    /// 创建一个新的句子。
    #[must_use]
    pub fn new(start: f64, end: f64, words: Vec<Word>) -> Self {
        Self { start, end, words }
    }

    /// 句子的时长（秒）。
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// 用空格拼接的单词文本。
    #[must_use]
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 用空格拼接的显示文本（优先使用 `raw`）。
    #[must_use]
    pub fn display_text(&self) -> String {
        self.words
            .iter()
            .map(Word::display_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 单词数。
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// 校验一条已反序列化的记录。
///
/// 结束早于开始的句子被视为损坏；单词级别的倒置会被修正为零时长。
fn validate_verse(mut verse: Verse, index: usize) -> Option<Verse> {
    if !verse.start.is_finite() || !verse.end.is_finite() || verse.end < verse.start {
        warn!(
            "第 {} 条歌词记录的时间无效 (start={}, end={})，已跳过",
            index + 1,
            verse.start,
            verse.end
        );
        return None;
    }

    for word in &mut verse.words {
        if word.end < word.start {
            warn!(
                "第 {} 条歌词记录中的单词 '{}' 结束早于开始，已修正为零时长",
                index + 1,
                word.text
            );
            word.end = word.start;
        }
    }

    if let Some(first) = verse.words.first()
        && (first.start - verse.start).abs() > START_MISMATCH_TOLERANCE
    {
        debug!(
            "第 {} 条歌词记录的开始时间 {} 与首个单词的开始时间 {} 不一致",
            index + 1,
            verse.start,
            first.start
        );
    }

    Some(verse)
}

/// 从 JSON 文本解析歌词列表，逐条校验。
///
/// 顶层必须是数组；数组中无法解析的记录会被跳过并记录警告。
pub fn parse_verses(content: &str) -> Result<Vec<Verse>, SubtitleError> {
    let records: Vec<Value> = serde_json::from_str(content)
        .map_err(|e| SubtitleError::json_parse(e, "歌词列表".to_string()))?;

    let verses = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value::<Verse>(record) {
            Ok(verse) => validate_verse(verse, index),
            Err(e) => {
                warn!("第 {} 条歌词记录格式错误，已跳过: {}", index + 1, e);
                None
            }
        })
        .collect();

    Ok(verses)
}

/// 从文件加载歌词列表。
pub fn load_verses(path: &Path) -> Result<Vec<Verse>, SubtitleError> {
    let content = fs::read_to_string(path)?;
    parse_verses(&content)
}

/// 将歌词列表以带缩进的 JSON 保存到文件。
pub fn save_verses(path: &Path, verses: &[Verse]) -> Result<(), SubtitleError> {
    let content = serde_json::to_string_pretty(verses)
        .map_err(|e| SubtitleError::json_parse(e, path.display().to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

/// 将时间四舍五入到两位小数。
#[must_use]
pub fn round_to_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
