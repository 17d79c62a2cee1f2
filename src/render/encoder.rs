//! 编码器的选择与调用。

use std::{fs, path::PathBuf, process::Command};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, error, info, warn};

use crate::{
    error::{KaraokeError, Result},
    render::filter_graph::CompositionPlan,
};

/// 视频编码器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum VideoCodec {
    /// NVIDIA 硬件编码
    #[strum(serialize = "h264_nvenc")]
    H264Nvenc,
    /// CPU 软件编码
    #[strum(serialize = "libx264")]
    Libx264,
}

impl VideoCodec {
    /// 是否使用 CRF 参数，硬件编码器不支持。
    #[must_use]
    pub fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::Libx264)
    }
}

/// 硬件加速策略。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(ascii_case_insensitive)]
pub enum HardwareAcceleration {
    /// 检测到可用的 NVIDIA GPU 时使用 NVENC
    #[default]
    Auto,
    /// 总是使用 NVENC
    Nvenc,
    /// 总是使用 libx264
    Software,
}

impl HardwareAcceleration {
    /// 确定实际使用的编码器。
    #[must_use]
    pub fn resolve(self) -> VideoCodec {
        match self {
            HardwareAcceleration::Nvenc => VideoCodec::H264Nvenc,
            HardwareAcceleration::Software => VideoCodec::Libx264,
            HardwareAcceleration::Auto => {
                if nvidia_gpu_available() {
                    info!("检测到 NVIDIA GPU，使用 NVENC 编码。");
                    VideoCodec::H264Nvenc
                } else {
                    warn!("未检测到 GPU，使用 libx264 (CPU) 编码。");
                    VideoCodec::Libx264
                }
            }
        }
    }
}

/// `nvidia-smi` 存在且能正常运行时认为 GPU 可用。
#[must_use]
pub fn nvidia_gpu_available() -> bool {
    let Ok(program) = which::which("nvidia-smi") else {
        return false;
    };
    Command::new(program)
        .arg("-L")
        .output()
        .is_ok_and(|output| output.status.success() && !output.stdout.is_empty())
}

/// 执行合成计划的能力。
pub trait VideoEncoder: Send + Sync {
    /// 执行计划并返回输出文件路径。
    fn encode(&self, plan: &CompositionPlan) -> Result<PathBuf>;
}

/// 以阻塞子进程的方式调用 `ffmpeg`。
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegEncoder {
    /// 使用 PATH 中的 `ffmpeg`。
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

    fn remove_partial_output(plan: &CompositionPlan) {
        if plan.output.exists()
            && let Err(e) = fs::remove_file(&plan.output)
        {
            warn!("无法删除不完整的输出文件 {:?}: {}", plan.output, e);
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(&self, plan: &CompositionPlan) -> Result<PathBuf> {
        let command_line = plan.command_line(&self.program.to_string_lossy());
        debug!("FFmpeg 命令: {}", command_line);

        let status = Command::new(&self.program)
            .args(plan.to_args())
            .status()
            .map_err(|e| {
                error!("无法启动 {:?}: {}", self.program, e);
                KaraokeError::Encoder {
                    command: command_line.clone(),
                    status: e.to_string(),
                }
            })?;

        if !status.success() {
            error!("FFmpeg 执行失败: {}", status);
            Self::remove_partial_output(plan);
            return Err(KaraokeError::Encoder {
                command: command_line,
                status: status.to_string(),
            });
        }

        info!("卡拉OK视频已生成: {:?}", plan.output);
        Ok(plan.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_codec_names() {
        assert_eq!(VideoCodec::H264Nvenc.to_string(), "h264_nvenc");
        assert_eq!(VideoCodec::Libx264.to_string(), "libx264");
        assert!(!VideoCodec::H264Nvenc.supports_crf());
        assert!(VideoCodec::Libx264.supports_crf());
    }

    #[test]
    fn test_explicit_acceleration() {
        assert_eq!(HardwareAcceleration::Nvenc.resolve(), VideoCodec::H264Nvenc);
        assert_eq!(HardwareAcceleration::Software.resolve(), VideoCodec::Libx264);
    }

    #[test]
    fn test_parse_acceleration() {
        assert_eq!(
            HardwareAcceleration::from_str("software").unwrap(),
            HardwareAcceleration::Software
        );
        assert_eq!(
            HardwareAcceleration::from_str("Auto").unwrap(),
            HardwareAcceleration::Auto
        );
        assert!(HardwareAcceleration::from_str("cuda").is_err());
    }
}
