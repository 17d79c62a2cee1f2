#![warn(missing_docs)]

//! # Karaoke Helper RS
//!
//! 一个用于制作卡拉OK视频的 Rust 库：把带单词级时间的歌词合成为 ASS 字幕，
//! 再通过 `ffmpeg` 把字幕、背景视频、倒计时和伴奏合成为视频。
//!
//! ## 主要功能
//!
//! - **歌词过滤**: 删除口播、前奏中的伴唱以及过短的句子。
//! - **字幕合成**:
//!   - 两行滚动式布局，间隔较短的两句合并显示。
//!   - 长间奏时显示占位文本，歌词重新开始前显示加载符号。
//!   - 每个单词使用 `\kf` 标签按实际时长高亮。
//! - **视频渲染**: 根据字幕中前两个事件之间的空档叠加倒计时并切换背景。
//! - **时间校正**: 以表格形式修改每句歌词的时间，并同步到字幕文件。
//!
//! ## 生成字幕并渲染
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use karaoke_helper_rs::{KaraokeHelper, config::KaraokeConfig};
//! use karaoke_helper_rs::render::RenderOptions;
//! use karaoke_helper_rs::subtitle::types::SubtitleOptions;
//!
//! let helper = KaraokeHelper::new(KaraokeConfig::default());
//! let working_dir = Path::new("/tmp/song");
//!
//! match helper.generate_subtitles(working_dir, &SubtitleOptions::default()) {
//!     Ok(path) => println!("字幕已生成: {:?}", path),
//!     Err(e) => eprintln!("生成字幕失败: {}", e),
//! }
//!
//! match helper.render_video(working_dir, Path::new("/tmp/out"), &RenderOptions::default()) {
//!     Ok(path) => println!("视频已生成: {:?}", path),
//!     Err(e) => eprintln!("渲染失败: {}", e),
//! }
//! ```
pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod render;
pub mod subtitle;
pub mod transcription;
pub mod worker;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

pub use crate::{
    error::{KaraokeError, Result},
    model::{metadata::SongMetadata, verse::Verse},
};

use crate::{
    config::KaraokeConfig,
    editor::TimingEditor,
    render::{KaraokeRenderer, MediaProbe, RenderOptions, VideoEncoder},
    subtitle::{process_karaoke_subtitles, types::SubtitleOptions},
};

// ==========================================================
//  顶层 API
// ==========================================================

/// 顶层客户端，封装了字幕生成、视频渲染和时间校正。
///
/// 这是与本库交互的主要入口点。
#[derive(Clone)]
pub struct KaraokeHelper {
    renderer: Arc<KaraokeRenderer>,
}

impl Default for KaraokeHelper {
    fn default() -> Self {
        Self::new(KaraokeConfig::default())
    }
}

impl KaraokeHelper {
    /// 使用 `ffprobe` 和 `ffmpeg` 创建一个新的实例。
    #[must_use]
    pub fn new(config: KaraokeConfig) -> Self {
        Self {
            renderer: Arc::new(KaraokeRenderer::new(config)),
        }
    }

    /// 从用户配置目录加载配置并创建实例。
    pub fn from_user_config() -> Result<Self> {
        Ok(Self::new(config::load_config()?))
    }

    /// 使用自定义的时长探测和编码器创建实例。
    #[must_use]
    pub fn with_backends(
        config: KaraokeConfig,
        probe: Box<dyn MediaProbe>,
        encoder: Box<dyn VideoEncoder>,
    ) -> Self {
        Self {
            renderer: Arc::new(KaraokeRenderer::with_backends(config, probe, encoder)),
        }
    }

    /// 当前使用的配置。
    #[must_use]
    pub fn config(&self) -> &KaraokeConfig {
        self.renderer.config()
    }

    /// 为工作目录生成 `karaoke_subtitles.ass`。
    ///
    /// # 参数
    /// * `working_dir` - 包含歌词、元数据和伴奏音频的目录。
    /// * `options` - 样式和合成参数。
    ///
    /// # 返回
    /// 成功时返回字幕文件的路径。
    pub fn generate_subtitles(&self, working_dir: &Path, options: &SubtitleOptions) -> Result<PathBuf> {
        process_karaoke_subtitles(working_dir, options, self.renderer.probe())
    }

    /// 渲染工作目录中的卡拉OK视频。
    ///
    /// # 返回
    /// 成功时返回输出视频的路径。
    pub fn render_video(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        options: &RenderOptions,
    ) -> Result<PathBuf> {
        self.renderer
            .process_karaoke_video(working_dir, output_dir, options)
    }

    /// 在后台线程中依次生成字幕和视频，执行期间独占该工作目录。
    ///
    /// 同一工作目录上已有任务时立即返回 `WorkdirBusy`。
    pub async fn create_karaoke(
        &self,
        working_dir: &Path,
        output_dir: &Path,
        subtitle_options: SubtitleOptions,
        render_options: RenderOptions,
    ) -> Result<PathBuf> {
        let renderer = Arc::clone(&self.renderer);
        let dir = working_dir.to_path_buf();
        let output_dir = output_dir.to_path_buf();

        worker::run_exclusive(working_dir, move || {
            process_karaoke_subtitles(&dir, &subtitle_options, renderer.probe())?;
            renderer.process_karaoke_video(&dir, &output_dir, &render_options)
        })
        .await
    }

    /// 打开工作目录的时间校正表格。
    pub fn timing_editor(&self, working_dir: &Path) -> Result<TimingEditor> {
        TimingEditor::open(working_dir)
    }
}
