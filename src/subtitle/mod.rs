//! 字幕合成模块
//!
//! 把工作目录中的歌词文件转换为 `karaoke_subtitles.ass`。

pub mod compositor;
pub mod generators;
pub mod parsers;
pub mod processors;
pub mod time;
pub mod types;

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::{
    error::{KaraokeError, Result},
    model::{metadata::SongMetadata, verse::load_verses},
    render::probe::MediaProbe,
    subtitle::{
        compositor::compose_events,
        generators::ass_generator::{TitleInfo, write_ass_file},
        types::SubtitleOptions,
    },
};

/// 转录后经过过滤的歌词文件。
pub const RAW_LYRICS_FILE_NAME: &str = "raw_lyrics.json";
/// 手动校正过时间的歌词文件，存在时优先使用。
pub const MODIFIED_LYRICS_FILE_NAME: &str = "modified_lyrics.json";
/// 默认的字幕文件名。
pub const SUBTITLE_FILE_NAME: &str = "karaoke_subtitles.ass";
/// 伴奏音频文件名。
pub const AUDIO_FILE_NAME: &str = "karaoke_audio.mp3";
/// 元数据文件名。
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// 选择要使用的歌词文件：`modified_lyrics.json` 优先，否则 `raw_lyrics.json`。
#[must_use]
pub fn select_lyrics_file(working_dir: &Path) -> Option<PathBuf> {
    let modified = working_dir.join(MODIFIED_LYRICS_FILE_NAME);
    if modified.is_file() {
        match fs::metadata(&modified).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let mtime: DateTime<Local> = mtime.into();
                info!(
                    "使用修改过的歌词文件，最后更新于 {}",
                    mtime.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Err(e) => warn!("无法获取 {:?} 的修改时间: {}", modified, e),
        }
        return Some(modified);
    }

    let raw = working_dir.join(RAW_LYRICS_FILE_NAME);
    if raw.is_file() {
        info!("没有修改过的歌词文件，使用 {:?}", raw);
        return Some(raw);
    }
    None
}

/// 读取工作目录中的元数据，文件缺失或损坏时使用默认值。
#[must_use]
pub fn load_metadata_or_default(working_dir: &Path) -> SongMetadata {
    let path = working_dir.join(METADATA_FILE_NAME);
    SongMetadata::load(&path).unwrap_or_else(|e| {
        warn!("无法读取元数据 {:?}，使用默认值: {}", path, e);
        SongMetadata::default()
    })
}

/// 为工作目录生成卡拉OK字幕文件，返回其路径。
///
/// # 错误
/// * `LyricsNotFound` - 两个歌词文件都不存在。
/// * `AudioDuration` - 无法获取伴奏音频的时长。
pub fn process_karaoke_subtitles(
    working_dir: &Path,
    options: &SubtitleOptions,
    probe: &dyn MediaProbe,
) -> Result<PathBuf> {
    let file_name = options.file_name.as_deref().unwrap_or(SUBTITLE_FILE_NAME);
    let output_file = working_dir.join(file_name);
    info!("生成卡拉OK字幕: {:?}", output_file);

    if options.overwrite
        && output_file.exists()
        && let Err(e) = fs::remove_file(&output_file)
    {
        warn!("无法删除已有的字幕文件 {:?}: {}", output_file, e);
    }

    let lyrics_file = select_lyrics_file(working_dir)
        .ok_or_else(|| KaraokeError::LyricsNotFound(working_dir.to_path_buf()))?;

    let metadata = load_metadata_or_default(working_dir);
    let title = TitleInfo::new(metadata.primary_artist(), metadata.title_or_default());

    let verses = load_verses(&lyrics_file)?;
    info!("从 {:?} 加载了 {} 句歌词", lyrics_file, verses.len());
    if let Some(first) = verses.first() {
        debug!("第一句: {:.2}s - {:.2}s", first.start, first.end);
    }

    let audio_file = working_dir.join(AUDIO_FILE_NAME);
    let audio_duration = probe.duration(&audio_file).map_err(|e| {
        warn!("获取音频时长失败: {}", e);
        KaraokeError::AudioDuration(audio_file.clone())
    })?;

    let events = compose_events(&verses, audio_duration, &options.compositor);
    write_ass_file(&output_file, &events, &title, &options.style)?;
    info!("字幕文件已生成，共 {} 个事件", events.len() + 1);

    Ok(output_file)
}
