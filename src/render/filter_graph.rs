//! 构建 `ffmpeg` 的输入列表、滤镜图和输出参数。
//!
//! 输入的序号由实际的输入列表计算，不依赖固定位置。

use std::path::{Path, PathBuf};

use crate::render::{countdown::CountdownWindow, encoder::VideoCodec};

/// 输入在合成中的作用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    /// 第一段背景（或唯一的背景）
    BackgroundFirst,
    /// 伴奏音频
    Audio,
    /// 倒计时片段
    Countdown,
    /// 第二段背景
    BackgroundRest,
    /// 标志图片
    Logo,
}

/// 输入的来源。
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// 普通文件
    File {
        /// 文件路径
        path: PathBuf,
        /// 是否无限循环 (`-stream_loop -1`)
        looped: bool,
    },
    /// `lavfi` 生成的纯黑画面
    Color {
        /// 宽
        width: u32,
        /// 高
        height: u32,
        /// 时长（秒）
        duration: f64,
    },
}

/// 合成计划中的一个输入。
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInput {
    /// 作用
    pub role: InputRole,
    /// 来源
    pub source: InputSource,
}

/// 输出编码参数。
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingParams {
    /// 视频编码器
    pub codec: VideoCodec,
    /// 编码预设
    pub preset: String,
    /// CRF 值，只对软件编码器生效
    pub crf: Option<u32>,
    /// 帧率
    pub fps: u32,
    /// 视频码率
    pub bitrate: String,
    /// 音频码率
    pub audio_bitrate: String,
}

/// 构建合成计划所需的全部信息。
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    /// 伴奏音频
    pub audio: &'a Path,
    /// 字幕文件
    pub subtitles: &'a Path,
    /// 字体目录
    pub fonts_dir: &'a Path,
    /// 输出文件
    pub output: &'a Path,
    /// 音频时长（秒）
    pub audio_duration: f64,
    /// 倒计时窗口
    pub window: Option<CountdownWindow>,
    /// 倒计时片段
    pub countdown_video: Option<&'a Path>,
    /// 第一段背景
    pub background_first: Option<&'a Path>,
    /// 第二段背景
    pub background_rest: Option<&'a Path>,
    /// 标志图片
    pub logo: Option<&'a Path>,
    /// 输出宽度
    pub width: u32,
    /// 输出高度
    pub height: u32,
    /// 编码参数
    pub encoding: EncodingParams,
}

/// 一次渲染的完整计划，可以转换为 `ffmpeg` 参数。
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    /// 按顺序排列的输入
    pub inputs: Vec<PlanInput>,
    /// `-filter_complex` 的内容
    pub filter_graph: String,
    /// 最终视频流的标签
    pub video_label: String,
    /// 编码参数
    pub encoding: EncodingParams,
    /// 输出文件
    pub output: PathBuf,
}

impl CompositionPlan {
    /// 指定作用的输入序号。
    #[must_use]
    pub fn input_index(&self, role: InputRole) -> Option<usize> {
        self.inputs.iter().position(|input| input.role == role)
    }

    /// 计划中引用的所有文件。
    #[must_use]
    pub fn media_files(&self) -> Vec<&Path> {
        self.inputs
            .iter()
            .filter_map(|input| match &input.source {
                InputSource::File { path, .. } => Some(path.as_path()),
                InputSource::Color { .. } => None,
            })
            .collect()
    }

    /// 转换为 `ffmpeg` 的参数（不含程序名）。
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        for input in &self.inputs {
            match &input.source {
                InputSource::File { path, looped } => {
                    if *looped {
                        args.extend(["-stream_loop".to_string(), "-1".to_string()]);
                    }
                    args.extend(["-i".to_string(), path.to_string_lossy().into_owned()]);
                }
                InputSource::Color {
                    width,
                    height,
                    duration,
                } => {
                    args.extend([
                        "-f".to_string(),
                        "lavfi".to_string(),
                        "-i".to_string(),
                        format!(
                            "color=c=black:s={width}x{height}:d={}",
                            format_seconds(*duration)
                        ),
                    ]);
                }
            }
        }

        let audio_index = self.input_index(InputRole::Audio).unwrap_or(1);
        args.extend([
            "-filter_complex".to_string(),
            self.filter_graph.clone(),
            "-map".to_string(),
            self.video_label.clone(),
            "-map".to_string(),
            format!("{audio_index}:a"),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:v".to_string(),
            self.encoding.codec.to_string(),
            "-preset".to_string(),
            self.encoding.preset.clone(),
        ]);

        if self.encoding.codec.supports_crf()
            && let Some(crf) = self.encoding.crf
        {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }

        args.extend([
            "-r".to_string(),
            self.encoding.fps.to_string(),
            "-b:v".to_string(),
            self.encoding.bitrate.clone(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.encoding.audio_bitrate.clone(),
            "-shortest".to_string(),
            self.output.to_string_lossy().into_owned(),
        ]);
        args
    }

    /// 用于日志和错误信息的完整命令行。
    #[must_use]
    pub fn command_line(&self, program: &str) -> String {
        std::iter::once(program.to_string())
            .chain(self.to_args().into_iter().map(|arg| {
                if arg.contains([' ', '\'', ';']) {
                    format!("\"{arg}\"")
                } else {
                    arg
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 根据倒计时窗口和可用的素材构建合成计划。
///
/// 有窗口且两段背景都可用时，背景在第二个事件开始处切换；
/// 窗口足够长且有倒计时片段时，叠加倒计时。
#[must_use]
pub fn build_composition_plan(request: &PlanRequest<'_>) -> CompositionPlan {
    let (width, height) = (request.width, request.height);
    let split_window = match (request.window, request.background_first, request.background_rest)
    {
        (Some(window), Some(_), Some(_)) => Some(window),
        _ => None,
    };
    let countdown = match (request.window, request.countdown_video) {
        (Some(window), Some(video)) if window.allows_countdown() => Some((window, video)),
        _ => None,
    };

    let mut inputs = Vec::with_capacity(5);
    inputs.push(PlanInput {
        role: InputRole::BackgroundFirst,
        source: match request.background_first {
            Some(path) => InputSource::File {
                path: path.to_path_buf(),
                looped: split_window.is_none(),
            },
            None => InputSource::Color {
                width,
                height,
                duration: request.audio_duration,
            },
        },
    });
    inputs.push(file_input(InputRole::Audio, request.audio));
    if let Some((_, video)) = countdown {
        inputs.push(file_input(InputRole::Countdown, video));
    }
    if split_window.is_some()
        && let Some(rest) = request.background_rest
    {
        inputs.push(file_input(InputRole::BackgroundRest, rest));
    }
    if let Some(logo) = request.logo {
        inputs.push(file_input(InputRole::Logo, logo));
    }

    let index_of = |role: InputRole| inputs.iter().position(|input| input.role == role);
    let fit = format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,pad=w={width}:h={height}:x='(ow-iw)/2':y='(oh-ih)/2'"
    );

    let mut chains = Vec::new();

    match (split_window, index_of(InputRole::BackgroundRest)) {
        (Some(window), Some(rest_index)) => {
            let switch_at = window.second_event_start;
            let rest_duration = (request.audio_duration - switch_at).max(0.0);
            chains.push(format!(
                "[0:v]trim=duration={},setpts=PTS-STARTPTS,{fit}[bg1]",
                format_seconds(switch_at)
            ));
            chains.push(format!(
                "[{rest_index}:v]trim=duration={},setpts=PTS-STARTPTS,{fit}[bg2]",
                format_seconds(rest_duration)
            ));
            chains.push("[bg1][bg2]concat=n=2:v=1:a=0[bg]".to_string());
        }
        _ => chains.push(format!("[0:v]{fit}[bg]")),
    }

    chains.push(format!(
        "[bg]subtitles={}:fontsdir={}[vsub_bg]",
        escape_filter_path(request.subtitles),
        escape_filter_path(request.fonts_dir)
    ));

    match (countdown, index_of(InputRole::Countdown)) {
        (Some((window, _)), Some(countdown_index)) => {
            let from = format_seconds(window.first_event_end);
            let until = format_seconds(window.second_event_start);
            chains.push(format!(
                "[{countdown_index}:v]setpts=PTS+{from}/TB,scale=300:240[countdown]"
            ));
            chains.push(format!(
                "[vsub_bg][countdown]overlay=530:4:enable='between(t,{from},{until})'[vsub]"
            ));
        }
        _ => chains.push("[vsub_bg]copy[vsub]".to_string()),
    }

    let video_label = match index_of(InputRole::Logo) {
        Some(logo_index) => {
            chains.push(format!("[{logo_index}:v]scale=160:180[logo_scaled]"));
            chains.push("[vsub][logo_scaled]overlay=48:337:enable='lt(t,4)'[vfinal]".to_string());
            "[vfinal]"
        }
        None => "[vsub]",
    };

    CompositionPlan {
        inputs,
        filter_graph: chains.join(";"),
        video_label: video_label.to_string(),
        encoding: request.encoding.clone(),
        output: request.output.to_path_buf(),
    }
}

fn file_input(role: InputRole, path: &Path) -> PlanInput {
    PlanInput {
        role,
        source: InputSource::File {
            path: path.to_path_buf(),
            looped: false,
        },
    }
}

/// 以最多三位小数输出秒数，去掉多余的零。
fn format_seconds(seconds: f64) -> String {
    let text = format!("{seconds:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// 滤镜参数值中需要转义的字符。
const OPTION_SPECIAL_CHARS: [char; 3] = ['\\', '\'', ':'];
/// 滤镜图中需要转义的字符。
const GRAPH_SPECIAL_CHARS: [char; 6] = ['\\', '\'', '[', ']', ',', ';'];

/// 转义滤镜参数中的路径。
///
/// 先按参数值转义，再按滤镜图转义，路径中的逗号、分号和方括号不会打断滤镜链。
fn escape_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    escape_chars(&escape_chars(&normalized, &OPTION_SPECIAL_CHARS), &GRAPH_SPECIAL_CHARS)
}

fn escape_chars(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
