//! 媒体文件的时长探测和有效性检查。

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, warn};

use crate::error::{KaraokeError, Result};

/// 获取媒体时长的能力。
pub trait MediaProbe: Send + Sync {
    /// 返回媒体文件的时长（秒）。
    fn duration(&self, path: &Path) -> Result<f64>;
}

/// 通过 `ffprobe` 获取时长。
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffprobe"),
        }
    }
}

impl FfprobeProbe {
    /// 使用 PATH 中的 `ffprobe`。
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的可执行文件。
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                warn!("无法运行 {:?}: {}", self.program, e);
                KaraokeError::AudioDuration(path.to_path_buf())
            })?;

        if !output.status.success() {
            warn!(
                "ffprobe 探测 {:?} 失败: {}",
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(KaraokeError::AudioDuration(path.to_path_buf()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = parse_ffprobe_duration(&stdout)
            .ok_or_else(|| KaraokeError::AudioDuration(path.to_path_buf()))?;
        debug!("{:?} 的时长为 {:.2}s", path, duration);
        Ok(duration)
    }
}

/// 解析 `ffprobe` 输出的时长，取第一个有效的正数。
#[must_use]
pub fn parse_ffprobe_duration(output: &str) -> Option<f64> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
}

/// 检查媒体文件存在、是普通文件、非空且可读。
pub fn validate_file(path: &Path) -> Result<()> {
    let invalid = |reason: &str| KaraokeError::InvalidMedia {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let metadata = fs::metadata(path).map_err(|_| invalid("文件不存在"))?;
    if !metadata.is_file() {
        return Err(invalid("不是普通文件"));
    }
    if metadata.len() == 0 {
        return Err(invalid("文件为空"));
    }
    File::open(path).map_err(|e| invalid(&format!("无法读取: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffprobe_duration() {
        assert_eq!(parse_ffprobe_duration("183.466000\n"), Some(183.466));
        assert_eq!(parse_ffprobe_duration("N/A\n95.5\n"), Some(95.5));
        assert_eq!(parse_ffprobe_duration("N/A"), None);
        assert_eq!(parse_ffprobe_duration(""), None);
    }

    #[test]
    fn test_validate_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("audio.mp3");
        let empty = dir.path().join("empty.mp3");
        fs::write(&good, b"ID3").unwrap();
        fs::write(&empty, b"").unwrap();

        assert!(validate_file(&good).is_ok());
        assert!(matches!(
            validate_file(&empty),
            Err(KaraokeError::InvalidMedia { .. })
        ));
        assert!(matches!(
            validate_file(&dir.path().join("missing.mp3")),
            Err(KaraokeError::InvalidMedia { .. })
        ));
        assert!(matches!(
            validate_file(dir.path()),
            Err(KaraokeError::InvalidMedia { .. })
        ));
    }

    #[test]
    fn test_missing_program_is_duration_error() {
        let probe = FfprobeProbe::with_program("/nonexistent/ffprobe-binary");
        let result = probe.duration(Path::new("a.mp3"));
        assert!(matches!(result, Err(KaraokeError::AudioDuration(_))));
    }
}
