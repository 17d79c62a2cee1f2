//! 视频渲染：读取字幕文件中的倒计时窗口，构建合成计划并调用编码器。

pub mod countdown;
pub mod encoder;
pub mod filter_graph;
pub mod probe;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::KaraokeConfig,
    editor::ass_editor::{edit_with_external_editor, preview_ass_content},
    error::Result,
    subtitle::{AUDIO_FILE_NAME, SUBTITLE_FILE_NAME, load_metadata_or_default},
};

pub use countdown::{CountdownWindow, parse_countdown_window, read_countdown_window};
pub use encoder::{FfmpegEncoder, HardwareAcceleration, VideoCodec, VideoEncoder};
pub use filter_graph::{CompositionPlan, EncodingParams, PlanRequest, build_composition_plan};
pub use probe::{FfprobeProbe, MediaProbe, validate_file};

/// 渲染参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// 输出宽度
    pub width: u32,
    /// 输出高度
    pub height: u32,
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
    /// 硬件加速策略
    pub hardware: HardwareAcceleration,
    /// 渲染前是否先用外部编辑器修改字幕
    pub edit_ass_before_render: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            preset: "fast".to_string(),
            crf: Some(23),
            fps: 24,
            bitrate: "3000k".to_string(),
            audio_bitrate: "192k".to_string(),
            hardware: HardwareAcceleration::Auto,
            edit_ass_before_render: false,
        }
    }
}

impl RenderOptions {
    /// 按 `1280x720` 的形式设置分辨率。
    pub fn set_resolution(&mut self, resolution: &str) -> Result<()> {
        let parsed = resolution
            .split_once(['x', 'X'])
            .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)));
        match parsed {
            Some((width, height)) if width > 0 && height > 0 => {
                self.width = width;
                self.height = height;
                Ok(())
            }
            _ => Err(anyhow::anyhow!("无效的分辨率: '{resolution}'").into()),
        }
    }
}

/// 渲染器，持有配置、时长探测和编码器。
pub struct KaraokeRenderer {
    config: KaraokeConfig,
    probe: Box<dyn MediaProbe>,
    encoder: Box<dyn VideoEncoder>,
}

impl KaraokeRenderer {
    /// 使用 `ffprobe` 和 `ffmpeg` 创建渲染器。
    #[must_use]
    pub fn new(config: KaraokeConfig) -> Self {
        Self::with_backends(config, Box::new(FfprobeProbe::new()), Box::new(FfmpegEncoder::new()))
    }

    /// 使用自定义的时长探测和编码器创建渲染器。
    #[must_use]
    pub fn with_backends(
        config: KaraokeConfig,
        probe: Box<dyn MediaProbe>,
        encoder: Box<dyn VideoEncoder>,
    ) -> Self {
        Self {
            config,
            probe,
            encoder,
        }
    }

    /// 配置。
    #[must_use]
    pub fn config(&self) -> &KaraokeConfig {
        &self.config
    }

    /// 时长探测。
    #[must_use]
    pub fn probe(&self) -> &dyn MediaProbe {
        self.probe.as_ref()
    }

    /// 为工作目录构建合成计划，并检查其中引用的所有文件。
    pub fn plan_karaoke_video(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        options: &RenderOptions,
    ) -> Result<CompositionPlan> {
        let audio = working_dir.join(AUDIO_FILE_NAME);
        let subtitles = working_dir.join(SUBTITLE_FILE_NAME);
        validate_file(&audio)?;
        validate_file(&subtitles)?;

        let metadata = load_metadata_or_default(working_dir);
        fs::create_dir_all(output_dir)?;
        let output = output_dir.join(format!("{}.mp4", metadata.sanitized_title()));

        let window = read_countdown_window(&subtitles)?;
        let countdown_video = match window {
            Some(w) if w.allows_countdown() => {
                countdown::select_countdown_video(&self.config.countdown_dir, w.duration())
            }
            Some(w) => {
                info!("倒计时窗口只有 {:.2}s，不叠加倒计时。", w.duration());
                None
            }
            None => None,
        };

        let audio_duration = self.probe.duration(&audio)?;
        let codec = options.hardware.resolve();

        let request = PlanRequest {
            audio: &audio,
            subtitles: &subtitles,
            fonts_dir: &self.config.fonts_dir,
            output: &output,
            audio_duration,
            window,
            countdown_video: countdown_video.as_deref(),
            background_first: self.config.background_first.as_deref(),
            background_rest: self.config.background_rest.as_deref(),
            logo: Some(&self.config.logo_path),
            width: options.width,
            height: options.height,
            encoding: EncodingParams {
                codec,
                preset: options.preset.clone(),
                crf: options.crf,
                fps: options.fps,
                bitrate: options.bitrate.clone(),
                audio_bitrate: options.audio_bitrate.clone(),
            },
        };
        let plan = build_composition_plan(&request);

        for path in plan.media_files() {
            validate_file(path)?;
        }
        Ok(plan)
    }

    /// 渲染工作目录中的卡拉OK视频，返回输出文件路径。
    ///
    /// 输出文件名由 `metadata.json` 中的歌曲名生成。
    pub fn process_karaoke_video(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        options: &RenderOptions,
    ) -> Result<PathBuf> {
        if options.edit_ass_before_render {
            self.edit_subtitles_before_render(working_dir);
        }

        let plan = self.plan_karaoke_video(working_dir, output_dir, options)?;
        info!("开始渲染 {:?}", plan.output);
        self.encoder.encode(&plan)
    }

    fn edit_subtitles_before_render(&self, working_dir: &Path) {
        let subtitles = working_dir.join(SUBTITLE_FILE_NAME);
        if !subtitles.exists() {
            return;
        }

        match preview_ass_content(&subtitles, 10) {
            Ok(preview) => info!("字幕预览:\n{}", preview),
            Err(e) => warn!("无法预览字幕: {}", e),
        }
        if let Err(e) = edit_with_external_editor(&subtitles, &self.config.editor) {
            warn!("字幕编辑失败，将使用原始文件继续: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::KaraokeError;

    struct FixedProbe(f64);

    impl MediaProbe for FixedProbe {
        fn duration(&self, _path: &Path) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[derive(Default, Clone)]
    struct RecordingEncoder {
        plans: Arc<Mutex<Vec<CompositionPlan>>>,
    }

    impl VideoEncoder for RecordingEncoder {
        fn encode(&self, plan: &CompositionPlan) -> Result<PathBuf> {
            self.plans.lock().unwrap().push(plan.clone());
            Ok(plan.output.clone())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        working_dir: PathBuf,
        output_dir: PathBuf,
        config: KaraokeConfig,
    }

    fn fixture(ass: &str, with_countdown: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let working_dir = dir.path().join("work");
        let assets = dir.path().join("assets");
        let countdown_dir = assets.join("gerisayim");
        fs::create_dir_all(&working_dir).unwrap();
        fs::create_dir_all(&countdown_dir).unwrap();

        fs::write(working_dir.join(AUDIO_FILE_NAME), b"audio").unwrap();
        fs::write(working_dir.join(SUBTITLE_FILE_NAME), ass).unwrap();
        fs::write(
            working_dir.join("metadata.json"),
            r#"{"title": "Gel Gönlümü Yerden Yere (Live)", "artists": ["Sezen Aksu"]}"#,
        )
        .unwrap();
        fs::write(assets.join("bg1.mp4"), b"video").unwrap();
        fs::write(assets.join("bg2.mp4"), b"video").unwrap();
        fs::write(assets.join("logo.png"), b"png").unwrap();
        if with_countdown {
            fs::write(countdown_dir.join("gerisayım 6.mov"), b"mov").unwrap();
        }

        let config = KaraokeConfig {
            fonts_dir: assets.join("fonts"),
            countdown_dir,
            logo_path: assets.join("logo.png"),
            background_first: Some(assets.join("bg1.mp4")),
            background_rest: Some(assets.join("bg2.mp4")),
            editor: "true".to_string(),
        };

        Fixture {
            output_dir: dir.path().join("out"),
            _dir: dir,
            working_dir,
            config,
        }
    }

    const ASS_WITH_GAP: &str = "[Events]\nDialogue: 0,0:00:00.00,0:00:04.00,Line1,,0,0,0,,title\nDialogue: 0,0:00:10.00,0:00:15.00,Line2,,0,0,0,,first\n";

    fn software() -> RenderOptions {
        RenderOptions {
            hardware: HardwareAcceleration::Software,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_with_countdown_and_split() {
        let fx = fixture(ASS_WITH_GAP, true);
        let encoder = RecordingEncoder::default();
        let renderer = KaraokeRenderer::with_backends(
            fx.config.clone(),
            Box::new(FixedProbe(200.0)),
            Box::new(encoder.clone()),
        );

        let output = renderer
            .process_karaoke_video(&fx.working_dir, &fx.output_dir, &software())
            .unwrap();

        assert_eq!(output, fx.output_dir.join("gel-g-nl-m-yerden-yere.mp4"));
        let plans = encoder.plans.lock().unwrap();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.inputs.len(), 5);
        assert!(plan.filter_graph.contains("[2:v]setpts=PTS+4/TB,scale=300:240[countdown]"));
        assert!(plan.filter_graph.contains("enable='between(t,4,10)'"));
        assert!(plan.filter_graph.contains("[3:v]trim=duration=190,"));
    }

    #[test]
    fn test_missing_countdown_clip_is_skipped() {
        let fx = fixture(ASS_WITH_GAP, false);
        let renderer = KaraokeRenderer::with_backends(
            fx.config.clone(),
            Box::new(FixedProbe(200.0)),
            Box::new(RecordingEncoder::default()),
        );

        let plan = renderer
            .plan_karaoke_video(&fx.working_dir, &fx.output_dir, &software())
            .unwrap();

        assert_eq!(plan.input_index(filter_graph::InputRole::Countdown), None);
        assert!(plan.filter_graph.contains("[vsub_bg]copy[vsub]"));
        assert!(plan.filter_graph.contains("concat=n=2"));
    }

    #[test]
    fn test_missing_logo_aborts() {
        let mut fx = fixture(ASS_WITH_GAP, true);
        fx.config.logo_path = fx.working_dir.join("nope.png");
        let renderer = KaraokeRenderer::with_backends(
            fx.config.clone(),
            Box::new(FixedProbe(200.0)),
            Box::new(RecordingEncoder::default()),
        );

        let result = renderer.plan_karaoke_video(&fx.working_dir, &fx.output_dir, &software());
        assert!(matches!(result, Err(KaraokeError::InvalidMedia { .. })));
    }

    #[test]
    fn test_missing_subtitles_aborts() {
        let fx = fixture(ASS_WITH_GAP, true);
        fs::remove_file(fx.working_dir.join(SUBTITLE_FILE_NAME)).unwrap();
        let renderer = KaraokeRenderer::with_backends(
            fx.config.clone(),
            Box::new(FixedProbe(200.0)),
            Box::new(RecordingEncoder::default()),
        );

        let result = renderer.plan_karaoke_video(&fx.working_dir, &fx.output_dir, &software());
        assert!(matches!(result, Err(KaraokeError::InvalidMedia { .. })));
    }

    #[test]
    fn test_set_resolution() {
        let mut options = RenderOptions::default();
        options.set_resolution("1920x1080").unwrap();
        assert_eq!((options.width, options.height), (1920, 1080));
        assert!(options.set_resolution("big").is_err());
        assert!(options.set_resolution("0x720").is_err());
    }
}
