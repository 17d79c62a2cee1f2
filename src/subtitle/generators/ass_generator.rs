//! ASS 格式生成器

use std::{fmt::Write, fs, path::Path};

use crate::{
    model::metadata::{UNKNOWN_ARTIST, UNKNOWN_TITLE},
    subtitle::{
        processors::color_resolver::resolve_color,
        time::seconds_to_timestamp,
        types::{AssStyleOptions, Event, EventPosition, StyleName, SubtitleError},
    },
};

/// 标题在画面上停留的秒数。
pub const TITLE_DURATION_SECONDS: f64 = 4.0;

const DEFAULT_PRIMARY: &str = "&H0000A5FF";
const DEFAULT_SECONDARY: &str = "&H00FFFFFF";
const DEFAULT_OUTLINE: &str = "&H00FF8080";
const DEFAULT_SHADOW: &str = "&H00FF8080";
const WHITE: &str = "&H00FFFFFF";

/// 标题左侧的固定边距（像素）。
const TITLE_LEFT_MARGIN: u32 = 200;
/// 艺术家名的颜色。
const ARTIST_COLOR: &str = "&H0C79E3&";

/// 标题事件中显示的艺术家和歌曲名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    /// 艺术家
    pub artist: String,
    /// 歌曲名
    pub song: String,
}

impl TitleInfo {
    /// 创建一个新的标题信息。
    pub fn new(artist: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            song: song.into(),
        }
    }

    /// 解析 `艺术家 ~ 歌曲名 [~ Karaoke]` 形式的标题。
    ///
    /// 末尾的 `Karaoke` 会被忽略；只有一段时艺术家视为未知。
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parts: Vec<&str> = text.split('~').map(str::trim).collect();

        if parts.len() > 1
            && parts
                .last()
                .is_some_and(|p| p.eq_ignore_ascii_case("karaoke"))
        {
            parts.pop();
        }

        match parts.as_slice() {
            [artist, song, ..] => Self::new(*artist, *song),
            [song] if !song.is_empty() => Self::new(UNKNOWN_ARTIST, *song),
            _ => Self::new(UNKNOWN_ARTIST, UNKNOWN_TITLE),
        }
    }

    /// 写入 `[Script Info]` 的标题文本。
    #[must_use]
    pub fn script_title(&self) -> String {
        format!("{} ~ {} ~ Karaoke", self.artist, self.song)
    }
}

/// 将文本中的换行转换为 ASS 的 `\N` 换行标记。
#[must_use]
pub fn escape_line_breaks(text: &str) -> String {
    text.replace("\r\n", r"\N")
        .replace('\n', r"\N")
        .replace('\r', "")
}

/// 生成完整的 ASS 文档。
///
/// # 参数
/// * `events` - 合成器输出的事件，按顺序写入（包括结尾的致谢事件）。
/// * `title` - 标题事件中显示的艺术家与歌曲名。
/// * `options` - 样式参数。
pub fn generate_ass(
    events: &[Event],
    title: &TitleInfo,
    options: &AssStyleOptions,
) -> Result<String, SubtitleError> {
    let mut ass_content = String::with_capacity(events.len() * 200 + 2048);

    write_script_info(&mut ass_content, title, options)?;
    write_styles(&mut ass_content, options)?;

    // --- [Events] 部分 ---
    writeln!(ass_content, "[Events]")?;
    writeln!(
        ass_content,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    )?;

    write_title_event(&mut ass_content, title, options)?;
    write_event_dialogues(&mut ass_content, events)?;

    Ok(ass_content)
}

/// 按顺序为每个事件写入一行 `Dialogue`。
pub fn write_event_dialogues(output: &mut String, events: &[Event]) -> Result<(), SubtitleError> {
    for event in events {
        write_dialogue_line(
            output,
            event.start,
            event.end,
            event.style,
            event.position,
            &event.text(),
        )?;
    }
    Ok(())
}

/// 生成 ASS 文档并写入文件。
pub fn write_ass_file(
    path: &Path,
    events: &[Event],
    title: &TitleInfo,
    options: &AssStyleOptions,
) -> Result<(), SubtitleError> {
    let content = generate_ass(events, title, options)?;
    fs::write(path, content)?;
    Ok(())
}

fn write_script_info(
    output: &mut String,
    title: &TitleInfo,
    options: &AssStyleOptions,
) -> Result<(), SubtitleError> {
    writeln!(output, "[Script Info]")?;
    writeln!(output, "Title: {}", escape_line_breaks(&title.script_title()))?;
    writeln!(output, "ScriptType: v4.00+")?;
    writeln!(output, "PlayResX: {}", options.screen_width)?;
    writeln!(output, "PlayResY: {}", options.screen_height)?;
    writeln!(output, "PlayDepth: 0")?;
    writeln!(output)?;
    Ok(())
}

fn write_styles(output: &mut String, options: &AssStyleOptions) -> Result<(), SubtitleError> {
    let primary = resolve_color(&options.primary_color, DEFAULT_PRIMARY);
    let secondary = resolve_color(&options.secondary_color, DEFAULT_SECONDARY);
    let outline = resolve_color(&options.outline_color, DEFAULT_OUTLINE);
    let shadow = resolve_color(&options.shadow_color, DEFAULT_SHADOW);

    let upper_margin = scaled(options.screen_height, 0.45);
    let lower_margin = scaled(options.screen_height, 0.55);

    writeln!(output, "[V4+ Styles]")?;
    writeln!(
        output,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    )?;

    // 上方活动行在高亮前后都使用次色
    write_style_line(
        output,
        StyleName::Line1,
        options,
        &secondary,
        &secondary,
        &outline,
        &shadow,
        upper_margin,
    )?;
    write_style_line(
        output,
        StyleName::Line2,
        options,
        &primary,
        &secondary,
        &outline,
        &shadow,
        lower_margin,
    )?;
    // 等待中的行在高亮阶段也保持白色
    write_style_line(
        output,
        StyleName::NextLine,
        options,
        WHITE,
        WHITE,
        &outline,
        &shadow,
        upper_margin,
    )?;
    writeln!(output)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_style_line(
    output: &mut String,
    name: StyleName,
    options: &AssStyleOptions,
    primary: &str,
    secondary: &str,
    outline: &str,
    shadow: &str,
    margin_v: u32,
) -> Result<(), SubtitleError> {
    writeln!(
        output,
        "Style: {name},{},{},{primary},{secondary},{outline},{shadow},1,0,0,0,100,100,0,0,1,{},{},2,0,0,{margin_v},1",
        options.font, options.fontsize, options.outline_size, options.shadow_size,
    )?;
    Ok(())
}

fn write_title_event(
    output: &mut String,
    title: &TitleInfo,
    options: &AssStyleOptions,
) -> Result<(), SubtitleError> {
    let fontsize = options.fontsize + 12;
    let margin_v = scaled(options.screen_height, 0.54);
    let song_y = margin_v + scaled(fontsize, 1.5);
    let song_fontsize = scaled(fontsize, 0.8);

    let text = format!(
        r"{{\pos({TITLE_LEFT_MARGIN},{margin_v})\an7\fs{fontsize}\fn{}\b1\1c{ARTIST_COLOR}}}{}\N{{\pos({TITLE_LEFT_MARGIN},{song_y})\an7\fs{song_fontsize}\fn{}\b0\1c&HFFFFFF&}}{}",
        options.artist_font, title.artist, options.title_font, title.song,
    );

    write_dialogue_line(
        output,
        0.0,
        TITLE_DURATION_SECONDS,
        StyleName::Line1,
        EventPosition::Standard,
        &text,
    )
}

/// 写入若干行逐秒倒数的数字事件。
///
/// 从 `start` 开始，每秒显示一个数字，最后一个数字的结束时间不会超过 `end`。
pub fn write_countdown_events(
    output: &mut String,
    start: f64,
    end: f64,
    options: &AssStyleOptions,
) -> Result<(), SubtitleError> {
    let total_seconds = (end - start).max(0.0) as u32;
    let pos_x = options.screen_width / 2;
    let pos_y = options.screen_height / 2;

    for remaining in (1..=total_seconds).rev() {
        let event_start = start + f64::from(total_seconds - remaining);
        let event_end = (event_start + 1.0).min(end);
        let text = format!(
            r"{{\pos({pos_x},{pos_y})\fs{}\b1}}{remaining}",
            options.fontsize
        );
        write_dialogue_line(
            output,
            event_start,
            event_end,
            StyleName::Line1,
            EventPosition::Standard,
            &text,
        )?;
    }
    Ok(())
}

fn write_dialogue_line(
    output: &mut String,
    start: f64,
    end: f64,
    style: StyleName,
    position: EventPosition,
    text: &str,
) -> Result<(), SubtitleError> {
    writeln!(
        output,
        "Dialogue: 0,{},{},{},,0,0,0,,{}{}",
        seconds_to_timestamp(start),
        seconds_to_timestamp(end),
        style,
        position.override_tag(),
        escape_line_breaks(text)
    )?;
    Ok(())
}

fn scaled(value: u32, factor: f64) -> u32 {
    (f64::from(value) * factor) as u32
}
