//! 用于演示 `karaoke-helper` 库的核心功能。
//!
//! ## 如何运行
//!
//! ```bash
//! cargo run --package karaoke_helper_rs --example demo -- <工作目录> [输出目录]
//! ```
//!
//! 工作目录中需要有 `raw_lyrics.json` 或 `modified_lyrics.json`、`karaoke_audio.mp3`，
//! 以及可选的 `metadata.json`。

use std::path::PathBuf;

use karaoke_helper_rs::{
    KaraokeHelper,
    error::Result,
    render::RenderOptions,
    subtitle::{parsers::ass_parser::parse_dialogues, types::SubtitleOptions},
};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(working_dir) = args.next().map(PathBuf::from) else {
        error!("用法: demo <工作目录> [输出目录]");
        return Ok(());
    };
    let output_dir = args
        .next()
        .map_or_else(|| working_dir.join("output"), PathBuf::from);

    info!("正在加载配置...");
    let helper = match KaraokeHelper::from_user_config() {
        Ok(helper) => helper,
        Err(e) => {
            warn!("加载配置失败，使用默认配置: {}", e);
            KaraokeHelper::default()
        }
    };

    let subtitle_options = SubtitleOptions {
        overwrite: true,
        ..Default::default()
    };
    let ass_path = helper.generate_subtitles(&working_dir, &subtitle_options)?;

    let content = std::fs::read_to_string(&ass_path)?;
    info!("字幕已生成: {:?}", ass_path);
    for dialogue in parse_dialogues(&content).iter().take(5) {
        info!(
            "  [{:>7.2} - {:>7.2}] {}",
            dialogue.start,
            dialogue.end,
            dialogue.plain_text()
        );
    }

    info!("开始渲染视频，输出目录: {:?}", output_dir);
    match helper
        .create_karaoke(
            &working_dir,
            &output_dir,
            subtitle_options,
            RenderOptions::default(),
        )
        .await
    {
        Ok(video) => info!("视频已生成: {:?}", video),
        Err(e) => error!("渲染失败: {}", e),
    }

    Ok(())
}
