//! 从字幕文件推导倒计时窗口，并选择对应的倒计时片段。

use std::{
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::{error::Result, subtitle::parsers::ass_parser::parse_dialogue_line};

/// 倒计时窗口短于此值（秒）时不叠加倒计时片段。
pub const MIN_COUNTDOWN_SECONDS: f64 = 2.0;

/// 第一个事件结束到第二个事件开始之间的空档。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownWindow {
    /// 第一个事件的结束时间（秒）
    pub first_event_end: f64,
    /// 第二个事件的开始时间（秒）
    pub second_event_start: f64,
}

impl CountdownWindow {
    /// 窗口的长度（秒）。
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.second_event_start - self.first_event_end
    }

    /// 是否长到足以显示倒计时片段。
    #[must_use]
    pub fn allows_countdown(&self) -> bool {
        self.duration() >= MIN_COUNTDOWN_SECONDS
    }
}

/// 从 ASS 文本的前两行 `Dialogue` 推导倒计时窗口。
///
/// 字段不全的行不计入；少于两行或第二行开始不晚于第一行结束时返回 `None`。
#[must_use]
pub fn parse_countdown_window(ass_text: &str) -> Option<CountdownWindow> {
    let mut dialogues = ass_text.lines().filter_map(parse_dialogue_line);
    let first = dialogues.next()?;
    let second = dialogues.next()?;

    let window = CountdownWindow {
        first_event_end: first.end,
        second_event_start: second.start,
    };
    (window.second_event_start > window.first_event_end).then_some(window)
}

/// 读取 ASS 文件并推导倒计时窗口。
pub fn read_countdown_window(path: &Path) -> Result<Option<CountdownWindow>> {
    let content = fs::read_to_string(path)?;
    let window = parse_countdown_window(&content);
    match &window {
        Some(w) => debug!(
            "倒计时窗口: {:.2}s - {:.2}s",
            w.first_event_end, w.second_event_start
        ),
        None => info!("{:?} 中没有倒计时窗口", path),
    }
    Ok(window)
}

/// 在目录中查找 `gerisayım {N}.mov`，N 为四舍五入后的窗口长度。
///
/// 文件名不区分大小写，`ı` 与 `i` 均可。目录或文件不存在时返回 `None` 并记录警告。
#[must_use]
pub fn select_countdown_video(directory: &Path, duration: f64) -> Option<PathBuf> {
    let count = duration.round() as i64;
    let pattern = match Regex::new(&format!(r"(?i)gerisay.?m\s*{count}\.mov$")) {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!("无法构造倒计时文件名匹配: {}", e);
            return None;
        }
    };

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("无法读取倒计时目录 {:?}: {}", directory, e);
            return None;
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.is_match(name))
        })
        .collect();
    candidates.sort();

    match candidates.into_iter().next() {
        Some(path) => {
            info!("选择倒计时片段 {:?}，窗口长度 {:.2}s", path, duration);
            Some(path)
        }
        None => {
            warn!("没有找到长度为 {:.2}s 的倒计时片段", duration);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn doc(lines: &[&str]) -> String {
        let mut content = String::from("[Events]\n");
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        content
    }

    #[test]
    fn test_window_absent_when_touching() {
        let ass = doc(&[
            "Dialogue: 0,0:00:00.00,0:00:04.00,Line1,,0,0,0,,title",
            "Dialogue: 0,0:00:04.00,0:00:09.00,Line2,,0,0,0,,first",
        ]);
        assert_eq!(parse_countdown_window(&ass), None);
    }

    #[test]
    fn test_window_present_with_gap() {
        let ass = doc(&[
            "Dialogue: 0,0:00:00.00,0:00:04.00,Line1,,0,0,0,,title",
            "Dialogue: 0,0:00:06.00,0:00:10.00,Line2,,0,0,0,,first",
            "Dialogue: 0,0:00:20.00,0:00:25.00,Line2,,0,0,0,,second",
        ]);
        let window = parse_countdown_window(&ass).unwrap();

        assert_eq!(window.first_event_end, 4.0);
        assert_eq!(window.second_event_start, 6.0);
        assert!(window.allows_countdown());
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let ass = doc(&[
            "Dialogue: 0,0:00:00.00,0:00:04.00",
            "Dialogue: 0,0:00:00.00,0:00:03.00,Line1,,0,0,0,,title",
            "Dialogue: 0,0:00:04.50,0:00:10.00,Line2,,0,0,0,,first",
        ]);
        let window = parse_countdown_window(&ass).unwrap();

        assert_eq!(window.first_event_end, 3.0);
        assert_eq!(window.second_event_start, 4.5);
        assert!(!window.allows_countdown());
    }

    #[test]
    fn test_single_dialogue_has_no_window() {
        let ass = doc(&["Dialogue: 0,0:00:00.00,0:00:04.00,Line1,,0,0,0,,title"]);
        assert_eq!(parse_countdown_window(&ass), None);
    }

    #[test]
    fn test_select_countdown_video() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("gerisayım 5.mov"), b"x").unwrap();
        fs::write(dir.path().join("GERISAYIM 8.MOV"), b"x").unwrap();
        fs::write(dir.path().join("gerisayım 15.mov"), b"x").unwrap();

        assert_eq!(
            select_countdown_video(dir.path(), 4.6),
            Some(dir.path().join("gerisayım 5.mov"))
        );
        assert_eq!(
            select_countdown_video(dir.path(), 8.2),
            Some(dir.path().join("GERISAYIM 8.MOV"))
        );
        assert_eq!(select_countdown_video(dir.path(), 3.0), None);
    }

    #[test]
    #[traced_test]
    fn test_missing_directory_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gerisayim");
        assert_eq!(select_countdown_video(&missing, 5.0), None);
        assert!(logs_contain("无法读取倒计时目录"));
    }
}
