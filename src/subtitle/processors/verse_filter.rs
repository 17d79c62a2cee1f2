//! 转录结果的过滤器。
//!
//! 依次执行三个过滤步骤，每一步都只删除整句，不会改变剩余歌词的顺序。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::verse::Verse;

/// 过滤器的参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerseFilterOptions {
    /// 包含这些短语（小写）的句子会被整句删除
    pub unwanted_phrases: Vec<String>,
    /// 在此时间（秒）之前开始的句子会接受前奏检查
    pub early_threshold: f64,
    /// 前奏中句子的最少单词数
    pub early_min_words: usize,
    /// 前奏更严格的时间界限（秒）
    pub intro_cutoff: f64,
    /// 在 `intro_cutoff` 之前开始的句子的最短时长（秒）
    pub intro_min_duration: f64,
    /// 前奏中的语气词（小写）
    pub interjections: Vec<String>,
    /// 全曲范围内句子的最短时长（秒）
    pub min_duration: f64,
    /// 全曲范围内句子的最少单词数
    pub min_words: usize,
}

impl Default for VerseFilterOptions {
    fn default() -> Self {
        Self {
            unwanted_phrases: [
                "abone ol",
                "altyazı",
                "m.k.",
                "yorum yap",
                "beğen butonuna",
                "tıklamayı unutmayın",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            early_threshold: 15.0,
            early_min_words: 4,
            intro_cutoff: 10.0,
            intro_min_duration: 2.0,
            interjections: [
                "ahh", "hah", "hayy", "hmm", "oh", "huh", "yeah", "woo", "woah", "hey", "heya",
                "oohh",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            min_duration: 0.5,
            min_words: 2,
        }
    }
}

/// 依次执行全部三个过滤步骤。
#[must_use]
pub fn filter_verses(verses: Vec<Verse>, options: &VerseFilterOptions) -> Vec<Verse> {
    let verses = filter_unwanted_phrases(verses, &options.unwanted_phrases);
    info!("过滤含有无关短语的句子后剩余 {} 句", verses.len());

    let verses = filter_early_vocals(verses, options);
    info!("过滤前奏中的伴唱后剩余 {} 句", verses.len());

    let verses = filter_short_verses(verses, options.min_duration, options.min_words);
    info!("过滤过短的句子后剩余 {} 句", verses.len());

    verses
}

/// 删除包含无关短语（如“订阅”之类的口播）的句子。
#[must_use]
pub fn filter_unwanted_phrases(verses: Vec<Verse>, phrases: &[String]) -> Vec<Verse> {
    verses
        .into_iter()
        .filter(|verse| {
            let text = verse.text().to_lowercase();
            match phrases.iter().find(|p| text.contains(p.as_str())) {
                Some(phrase) => {
                    debug!("删除 {}s 处含有 '{}' 的句子: '{}'", verse.start, phrase, text);
                    false
                }
                None => true,
            }
        })
        .collect()
}

/// 删除歌曲开头的伴唱和噪音。
#[must_use]
pub fn filter_early_vocals(verses: Vec<Verse>, options: &VerseFilterOptions) -> Vec<Verse> {
    verses
        .into_iter()
        .filter(|verse| !is_early_noise(verse, options))
        .collect()
}

fn is_early_noise(verse: &Verse, options: &VerseFilterOptions) -> bool {
    if verse.start >= options.early_threshold {
        return false;
    }

    if verse.word_count() < options.early_min_words {
        debug!(
            "删除 {}s 处只有 {} 个单词的前奏句子",
            verse.start,
            verse.word_count()
        );
        return true;
    }

    if verse.start >= options.intro_cutoff {
        return false;
    }

    if verse.duration() < options.intro_min_duration {
        debug!(
            "删除 {}s 处时长为 {:.2}s 的前奏短句",
            verse.start,
            verse.duration()
        );
        return true;
    }

    let has_interjection = verse.words.iter().any(|word| {
        let token = word
            .text
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        options.interjections.iter().any(|i| *i == token)
    });
    if has_interjection {
        debug!("删除 {}s 处类似噪音的前奏句子: '{}'", verse.start, verse.text());
    }
    has_interjection
}

/// 删除时长或单词数过少的句子。
#[must_use]
pub fn filter_short_verses(verses: Vec<Verse>, min_duration: f64, min_words: usize) -> Vec<Verse> {
    verses
        .into_iter()
        .filter(|verse| {
            if verse.duration() < min_duration {
                debug!(
                    "删除 {}s 处时长为 {:.2}s 的短句",
                    verse.start,
                    verse.duration()
                );
                return false;
            }
            if verse.word_count() < min_words {
                debug!(
                    "删除 {}s 处只有 {} 个单词的句子",
                    verse.start,
                    verse.word_count()
                );
                return false;
            }
            true
        })
        .collect()
}
