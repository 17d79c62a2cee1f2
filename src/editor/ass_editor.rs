//! 字幕文件的预览和外部编辑器往返。

use std::{
    fmt::Write,
    fs,
    path::Path,
    process::Command,
};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{KaraokeError, Result};

/// 预览中最多显示的样式行数。
const PREVIEW_STYLE_LINES: usize = 5;

/// 生成字幕文件的简短预览：前几行样式和前 `max_lines` 行 `Dialogue`。
pub fn preview_ass_content(path: &Path, max_lines: usize) -> Result<String> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    let styles: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.trim_start().starts_with("Style:"))
        .collect();
    let dialogues: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.trim_start().starts_with("Dialogue:"))
        .collect();

    let mut preview = String::new();
    if !styles.is_empty() {
        preview.push_str("# 样式:\n");
        for line in styles.iter().take(PREVIEW_STYLE_LINES) {
            writeln!(preview, "{}", line.trim())?;
        }
        if styles.len() > PREVIEW_STYLE_LINES {
            writeln!(preview, "... (共 {} 个样式)", styles.len())?;
        }
    }

    if !dialogues.is_empty() {
        preview.push_str("\n# 字幕行:\n");
        for line in dialogues.iter().take(max_lines) {
            writeln!(preview, "{}", line.trim())?;
        }
        if dialogues.len() > max_lines {
            writeln!(
                preview,
                "... (共 {} 行字幕，显示了 {} 行)",
                dialogues.len(),
                max_lines
            )?;
        }
    }

    let shown = styles.len() + dialogues.len();
    if lines.len() > shown {
        write!(preview, "\n# 文件共 {} 行。", lines.len())?;
    }
    Ok(preview)
}

/// 用外部编辑器修改字幕文件。
///
/// 先复制到临时文件再打开编辑器，编辑器正常退出且内容不为空时才写回原文件。
/// `editor` 可以带参数，例如 `code --wait`。
pub fn edit_with_external_editor(path: &Path, editor: &str) -> Result<()> {
    let temp_path = std::env::temp_dir().join(format!("karaoke-{}.ass", Uuid::new_v4()));
    fs::copy(path, &temp_path)?;
    debug!("已复制字幕到临时文件 {:?}", temp_path);

    let result = run_editor_and_copy_back(path, &temp_path, editor);

    if let Err(e) = fs::remove_file(&temp_path) {
        warn!("无法删除临时文件 {:?}: {}", temp_path, e);
    }
    result
}

fn run_editor_and_copy_back(path: &Path, temp_path: &Path, editor: &str) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| KaraokeError::Editor("没有指定编辑器".to_string()))?;

    let status = Command::new(program)
        .args(parts)
        .arg(temp_path)
        .status()
        .map_err(|e| KaraokeError::Editor(format!("无法启动编辑器 '{program}': {e}")))?;
    if !status.success() {
        return Err(KaraokeError::Editor(format!(
            "编辑器 '{program}' 异常退出: {status}"
        )));
    }

    let edited = fs::read_to_string(temp_path)?;
    if edited.trim().is_empty() {
        return Err(KaraokeError::Editor("编辑后的字幕文件为空".to_string()));
    }

    fs::write(path, edited)?;
    info!("字幕文件 {:?} 已更新", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const ASS: &str = "[Script Info]\nTitle: A\n\n[V4+ Styles]\nStyle: Line1,f,60\nStyle: Line2,f,60\n\n[Events]\nDialogue: 0,0:00:00.00,0:00:04.00,Line1,,0,0,0,,bir\nDialogue: 0,0:00:05.00,0:00:06.00,Line1,,0,0,0,,iki\nDialogue: 0,0:00:07.00,0:00:08.00,Line1,,0,0,0,,üç\n";

    fn write_ass() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("karaoke_subtitles.ass");
        fs::write(&path, ASS).unwrap();
        (dir, path)
    }

    #[test]
    fn test_preview_limits_dialogues() {
        let (_dir, path) = write_ass();
        let preview = preview_ass_content(&path, 2).unwrap();

        assert!(preview.contains("Style: Line2,f,60"));
        assert!(preview.contains(",,iki\n"));
        assert!(!preview.contains(",,üç"));
        assert!(preview.contains("共 3 行字幕，显示了 2 行"));
        assert!(preview.contains("文件共 11 行"));
    }

    #[cfg(unix)]
    #[test]
    fn test_editor_round_trip_keeps_content() {
        let (_dir, path) = write_ass();
        edit_with_external_editor(&path, "true").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), ASS);
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_result_leaves_original() {
        let (_dir, path) = write_ass();
        let result = edit_with_external_editor(&path, "truncate -s 0");

        assert!(matches!(result, Err(KaraokeError::Editor(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), ASS);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_editor_is_an_error() {
        let (_dir, path) = write_ass();
        assert!(matches!(
            edit_with_external_editor(&path, "false"),
            Err(KaraokeError::Editor(_))
        ));
        assert!(matches!(
            edit_with_external_editor(&path, "/nonexistent/editor"),
            Err(KaraokeError::Editor(_))
        ));
    }
}
