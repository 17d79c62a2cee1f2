//! 歌曲元数据 (`metadata.json`)。

use std::{fs, path::Path, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::subtitle::types::SubtitleError;

/// 未知歌曲名的占位文本。
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// 未知艺术家的占位文本。
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

static PARENTHESIZED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)").expect("编译 PARENTHESIZED_REGEX 失败"));

static NON_ALNUM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("编译 NON_ALNUM_REGEX 失败"));

/// `metadata.json` 的内容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SongMetadata {
    /// 歌曲名
    #[serde(default)]
    pub title: Option<String>,
    /// 艺术家列表
    #[serde(default)]
    pub artists: Vec<String>,
}

impl SongMetadata {
    /// 从文件加载元数据。
    pub fn load(path: &Path) -> Result<Self, SubtitleError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SubtitleError::json_parse(e, path.display().to_string()))
    }

    /// 歌曲名，缺失时返回占位文本。
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// 第一位艺术家，缺失时返回占位文本。
    #[must_use]
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    /// 由歌曲名生成视频文件名的主干部分。
    ///
    /// 去掉括号内容，非字母数字的字符替换为 `-`，并转为小写。
    #[must_use]
    pub fn sanitized_title(&self) -> String {
        let without_parens = PARENTHESIZED_REGEX.replace_all(self.title_or_default(), "");
        let dashed = NON_ALNUM_REGEX.replace_all(without_parens.trim(), "-");
        let slug = dashed.trim_matches('-').to_lowercase();
        if slug.is_empty() {
            "karaoke".to_string()
        } else {
            slug
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let meta: SongMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.title_or_default(), UNKNOWN_TITLE);
        assert_eq!(meta.primary_artist(), UNKNOWN_ARTIST);
    }

    #[test]
    fn test_primary_artist_is_first() {
        let meta: SongMetadata =
            serde_json::from_str(r#"{"title": "Gel", "artists": ["Sezen Aksu", "Tarkan"]}"#)
                .unwrap();
        assert_eq!(meta.primary_artist(), "Sezen Aksu");
    }

    #[test]
    fn test_sanitized_title() {
        let meta = SongMetadata {
            title: Some("Hello World (Official Video)".to_string()),
            artists: vec![],
        };
        assert_eq!(meta.sanitized_title(), "hello-world");

        let meta = SongMetadata {
            title: Some("Şımarık!".to_string()),
            artists: vec![],
        };
        assert_eq!(meta.sanitized_title(), "mar-k");
    }
}
