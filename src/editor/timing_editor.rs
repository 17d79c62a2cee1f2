//! 时间校正表格
//!
//! 以表格的形式展示每句歌词的序号、开始时间、结束时间和文本。
//! 保存时同时更新 `modified_lyrics.json` 和字幕文件中由这些歌词生成的 `Dialogue` 行。

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    error::{KaraokeError, Result},
    model::verse::{Verse, Word, load_verses, round_to_centis, save_verses},
    subtitle::{
        MODIFIED_LYRICS_FILE_NAME, SUBTITLE_FILE_NAME,
        compositor::compose_events,
        generators::ass_generator::write_event_dialogues,
        parsers::ass_parser::{parse_dialogues, replace_dialogues, retime_dialogues},
        select_lyrics_file,
        time::{seconds_to_timestamp, timestamp_to_seconds},
        types::{CompositorOptions, Event},
    },
};

/// 字幕文件开头的标题事件占用的 `Dialogue` 行数，不参与时间校正。
const TITLE_DIALOGUES: usize = 1;

const TSV_HEADER: &str = "sequence\tstart\tend\ttext";

/// 表格中的一行。
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRow {
    /// 序号，从 1 开始
    pub sequence: usize,
    /// 开始时间（秒）
    pub start: f64,
    /// 结束时间（秒）
    pub end: f64,
    /// 以空格连接的歌词
    pub text: String,
}

impl TimingRow {
    /// 解析制表符分隔的表格文本。
    ///
    /// 表头和序号无效的行会被跳过；时间可以写成秒数或 `H:MM:SS.CC`，
    /// 无法解析的时间按 `0.0` 处理。
    #[must_use]
    pub fn parse_table(text: &str) -> Vec<TimingRow> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let cells: Vec<&str> = line.splitn(4, '\t').collect();
                let sequence = cells.first()?.trim().parse::<usize>().ok();
                match (sequence, cells.as_slice()) {
                    (Some(sequence), [_, start, end, rest @ ..]) => Some(TimingRow {
                        sequence,
                        start: parse_time_cell(start),
                        end: parse_time_cell(end),
                        text: rest.first().map_or_else(String::new, |t| t.trim().to_string()),
                    }),
                    _ => {
                        if line.trim() != TSV_HEADER {
                            warn!("跳过无法解析的表格行: '{}'", line);
                        }
                        None
                    }
                }
            })
            .collect()
    }

    fn to_tsv_line(&self) -> String {
        format!(
            "{}\t{:.2}\t{:.2}\t{}",
            self.sequence, self.start, self.end, self.text
        )
    }
}

fn parse_time_cell(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.contains(':') {
        return timestamp_to_seconds(cell);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .unwrap_or_else(|| {
            warn!("无法解析时间 '{}'，使用 0.0 代替", cell);
            0.0
        })
}

/// 一次保存的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    /// 更新了时间的歌词数
    pub updated_verses: usize,
    /// 新建的歌词数
    pub added_verses: usize,
    /// 改写了时间的 `Dialogue` 行数
    pub updated_dialogues: usize,
}

/// 时间校正表格的后端。
#[derive(Debug, Clone)]
pub struct TimingEditor {
    working_dir: PathBuf,
    verses: Vec<Verse>,
    ass_path: PathBuf,
    ass_content: Option<String>,
    compositor_options: CompositorOptions,
}

impl TimingEditor {
    /// 打开工作目录，读取歌词和字幕文件（如果存在）。
    pub fn open(working_dir: &Path) -> Result<Self> {
        let lyrics_file = select_lyrics_file(working_dir)
            .ok_or_else(|| KaraokeError::LyricsNotFound(working_dir.to_path_buf()))?;
        let verses = load_verses(&lyrics_file)?;

        let ass_path = working_dir.join(SUBTITLE_FILE_NAME);
        let ass_content = match fs::read_to_string(&ass_path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("无法读取字幕文件 {:?}: {}", ass_path, e);
                None
            }
        };

        Ok(Self {
            working_dir: working_dir.to_path_buf(),
            verses,
            ass_path,
            ass_content,
            compositor_options: CompositorOptions::default(),
        })
    }

    /// 设置生成字幕时使用的合成参数，用于把歌词对应到字幕中的事件。
    #[must_use]
    pub fn with_compositor_options(mut self, options: CompositorOptions) -> Self {
        self.compositor_options = options;
        self
    }

    /// 当前的歌词。
    #[must_use]
    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    /// 生成表格行。
    #[must_use]
    pub fn rows(&self) -> Vec<TimingRow> {
        self.verses
            .iter()
            .enumerate()
            .map(|(i, verse)| TimingRow {
                sequence: i + 1,
                start: round_to_centis(verse.start),
                end: round_to_centis(verse.end),
                text: verse.text(),
            })
            .collect()
    }

    /// 生成带表头的制表符分隔文本。
    #[must_use]
    pub fn to_tsv(&self) -> String {
        let mut table = String::from(TSV_HEADER);
        for row in self.rows() {
            table.push('\n');
            table.push_str(&row.to_tsv_line());
        }
        table.push('\n');
        table
    }

    /// 保存修改后的表格。
    ///
    /// 序号对应已有歌词时只改写开始和结束时间，单词保持不变；没有对应歌词时，
    /// 用该行文本新建一句，每个单词都使用整行的时间。保存后歌词按开始时间排序。
    ///
    /// 字幕文件中的事件按修改前后的歌词重新合成来定位：事件结构不变时只改写
    /// 时间变化的 `Dialogue` 行，结构变化（例如两句因间隔变短而合并）时重写
    /// 标题之后的全部事件。字幕与歌词对不上时不修改字幕文件。
    /// 歌词写入失败时返回错误，字幕文件写入失败只记录警告。
    pub fn save(&mut self, rows: &[TimingRow]) -> Result<SaveReport> {
        let mut report = SaveReport::default();
        let previous_verses = self.verses.clone();

        for row in rows {
            let Some(idx) = row.sequence.checked_sub(1) else {
                warn!("忽略序号为 0 的行");
                continue;
            };

            if let Some(verse) = self.verses.get_mut(idx) {
                verse.start = row.start;
                verse.end = row.end;
                report.updated_verses += 1;
            } else {
                let words = row
                    .text
                    .split_whitespace()
                    .map(|token| Word::new(token, row.start, row.end))
                    .collect();
                self.verses.push(Verse::new(row.start, row.end, words));
                report.added_verses += 1;
            }
        }

        // 稳定排序，开始时间相同的歌词保持原有顺序
        self.verses.sort_by(|a, b| a.start.total_cmp(&b.start));

        let lyrics_path = self.working_dir.join(MODIFIED_LYRICS_FILE_NAME);
        save_verses(&lyrics_path, &self.verses)?;
        info!(
            "时间校正已保存到 {:?}: 更新 {} 句，新增 {} 句",
            lyrics_path, report.updated_verses, report.added_verses
        );

        let Some(content) = &self.ass_content else {
            return Ok(report);
        };
        let Some((updated, rewritten)) = self.sync_subtitles(content, &previous_verses) else {
            return Ok(report);
        };

        if updated == *content {
            debug!("字幕文件中的事件时间没有变化");
            return Ok(report);
        }
        match fs::write(&self.ass_path, &updated) {
            Ok(()) => {
                report.updated_dialogues = rewritten;
                self.ass_content = Some(updated);
            }
            Err(e) => warn!("无法更新字幕文件 {:?}: {}", self.ass_path, e),
        }

        Ok(report)
    }

    /// 计算更新后的字幕内容和改写的 `Dialogue` 行数。
    ///
    /// 字幕中的事件与修改前的歌词不一致时返回 `None`。
    fn sync_subtitles(&self, content: &str, previous_verses: &[Verse]) -> Option<(String, usize)> {
        let dialogues = parse_dialogues(content);
        let event_dialogues = dialogues.get(TITLE_DIALOGUES..).unwrap_or_default();
        // 结尾的致谢事件一直持续到音频结束
        let audio_duration = event_dialogues
            .iter()
            .map(|d| d.end)
            .fold(0.0_f64, f64::max);

        let previous_events =
            compose_events(previous_verses, audio_duration, &self.compositor_options);
        let aligned = event_dialogues.len() == previous_events.len()
            && event_dialogues.iter().zip(&previous_events).all(|(dialogue, event)| {
                seconds_to_timestamp(dialogue.start) == seconds_to_timestamp(event.start)
                    && seconds_to_timestamp(dialogue.end) == seconds_to_timestamp(event.end)
            });
        if !aligned {
            warn!(
                "字幕文件 {:?} 与歌词不一致，未同步时间，请重新生成字幕",
                self.ass_path
            );
            return None;
        }

        let events = compose_events(&self.verses, audio_duration, &self.compositor_options);
        let layout_unchanged = events.len() == previous_events.len()
            && events
                .iter()
                .zip(&previous_events)
                .all(|(new, old)| same_layout(new, old));

        if layout_unchanged {
            let timings: HashMap<usize, (f64, f64)> = events
                .iter()
                .zip(&previous_events)
                .enumerate()
                .filter(|(_, (new, old))| {
                    seconds_to_timestamp(new.start) != seconds_to_timestamp(old.start)
                        || seconds_to_timestamp(new.end) != seconds_to_timestamp(old.end)
                })
                .map(|(i, (new, _))| (i + TITLE_DIALOGUES, (new.start, new.end)))
                .collect();
            return Some(retime_dialogues(content, &timings));
        }

        let mut block = String::new();
        if let Err(e) = write_event_dialogues(&mut block, &events) {
            warn!("无法生成字幕事件: {}", e);
            return None;
        }
        info!(
            "歌词的合并方式发生了变化，重写了 {} 个字幕事件",
            events.len()
        );
        Some((replace_dialogues(content, TITLE_DIALOGUES, &block), events.len()))
    }
}

/// 两个事件除时间外完全相同。
fn same_layout(new: &Event, old: &Event) -> bool {
    new.kind == old.kind
        && new.verses == old.verses
        && new.position == old.position
        && new.style == old.style
        && new.text() == old.text()
}
