//! 将颜色名解析为 ASS 的 `&HAABBGGRR` 颜色值。

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// 已知的颜色名及其 ASS 值 (BGR 顺序)。
const NAMED_COLORS: &[(&str, &str)] = &[
    ("White", "&H00FFFFFF"),
    ("Black", "&H00000000"),
    ("Red", "&H000000FF"),
    ("Green", "&H0000FF00"),
    ("Blue", "&H00FF0000"),
    ("Yellow", "&H0000FFFF"),
    ("Orange", "&H0000A5FF"),
    ("Purple", "&H00800080"),
    ("Pink", "&H00CBC0FF"),
    ("Cyan", "&H00FFFF00"),
    ("Magenta", "&H00FF00FF"),
    ("Gray", "&H00808080"),
    ("Light Blue", "&H00FF8080"),
    ("Light Green", "&H0090EE90"),
    ("Dark Blue", "&H008B0000"),
    ("Gold", "&H0000D7FF"),
];

/// 匹配直接给出的 ASS 颜色值，例如 `&H0000A5FF` 或 `&HFFFFFF&`。
static ASS_COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&H[0-9A-Fa-f]{6}([0-9A-Fa-f]{2})?&?$").expect("编译 ASS_COLOR_REGEX 失败")
});

/// 返回所有可用的颜色名。
#[must_use]
pub fn available_colors() -> Vec<&'static str> {
    NAMED_COLORS.iter().map(|(name, _)| *name).collect()
}

/// 解析颜色名或 ASS 颜色值。
///
/// 颜色名不区分大小写和空白。无法识别的输入会回退到 `default` 并记录警告。
#[must_use]
pub fn resolve_color(value: &str, default: &str) -> String {
    let trimmed = value.trim();

    if ASS_COLOR_REGEX.is_match(trimmed) {
        return trimmed.to_uppercase();
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.replace(' ', "").to_lowercase() == normalized)
        .map_or_else(
            || {
                warn!("未知的颜色 '{}'，使用默认值 {}", trimmed, default);
                default.to_string()
            },
            |(_, ass)| (*ass).to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(resolve_color("Orange", "&H00FFFFFF"), "&H0000A5FF");
        assert_eq!(resolve_color("light blue", "&H00FFFFFF"), "&H00FF8080");
        assert_eq!(resolve_color(" LightBlue ", "&H00FFFFFF"), "&H00FF8080");
    }

    #[test]
    fn test_raw_values_pass_through() {
        assert_eq!(resolve_color("&H0000a5ff", "&H00FFFFFF"), "&H0000A5FF");
        assert_eq!(resolve_color("&HFFFFFF&", "&H00000000"), "&HFFFFFF&");
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        assert_eq!(resolve_color("Ultraviolet", "&H00FF8080"), "&H00FF8080");
        assert_eq!(resolve_color("&HXYZ", "&H00FF8080"), "&H00FF8080");
    }

    #[test]
    fn test_available_colors_lists_names() {
        let names = available_colors();
        assert!(names.contains(&"Orange"));
        assert!(names.contains(&"Light Blue"));
    }
}
