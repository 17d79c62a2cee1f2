//! 事件合成器
//!
//! 从左到右扫描过滤后的歌词，生成两行滚动式卡拉OK的显示事件：
//! 间隔较短的相邻两句合并为一个事件（上行为普通文本，下行为卡拉OK文本），
//! 间隔较长时单独显示，并在前面插入加载符号和间奏占位事件。

use tracing::{debug, warn};

use crate::{
    model::verse::{Verse, Word},
    subtitle::types::{CompositorOptions, Event, EventKind, EventPosition, StyleName},
};

/// 加载符号的高亮时长（厘秒）。
const LOADER_CENTISECONDS: u32 = 200;
/// 加载符号让事件提前出现的秒数。
const LOADER_LEAD_SECONDS: f64 = 2.0;
/// 间奏占位事件与前后歌词之间留出的空隙（秒）。
const FILLER_PADDING_SECONDS: f64 = 0.3;

/// 计算单词的高亮时长（厘秒），等于单词自身时长的四舍五入。
#[must_use]
pub fn highlight_centiseconds(word: &Word) -> u32 {
    ((word.end - word.start) * 100.0).round().max(0.0) as u32
}

/// 构建一行带 `\kf` 标签的文本，可选地在行首加入加载符号。
///
/// 没有任何内容时返回空字符串。
#[must_use]
pub fn build_karaoke_line(words: &[Word], loader: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(words.len() + 1);

    if let Some(glyphs) = loader {
        parts.push(format!(r"{{\kf{LOADER_CENTISECONDS}}}{glyphs}"));
    }
    for word in words {
        parts.push(format!(
            r"{{\kf{}}}{}",
            highlight_centiseconds(word),
            word.display_text()
        ));
    }

    if parts.is_empty() {
        return String::new();
    }

    let mut line = String::from(r"{\fad(300,0)}");
    line.push_str(&parts.join(" "));
    line
}

/// 合成全部显示事件，包括间奏占位事件和结尾的致谢事件。
///
/// # 参数
/// * `verses` - 已过滤、按时间排序的歌词。
/// * `audio_duration` - 音频总时长（秒）。
/// * `options` - 合成参数。
#[must_use]
pub fn compose_events(
    verses: &[Verse],
    audio_duration: f64,
    options: &CompositorOptions,
) -> Vec<Event> {
    let sentinel_at_end = verses
        .last()
        .is_some_and(|last| last.display_text().contains(&options.texts.closing_sentinel));

    // 结尾的署名行会被致谢文本替换，不作为歌词显示
    let lyric_verses = if sentinel_at_end {
        &verses[..verses.len() - 1]
    } else {
        verses
    };

    let mut events = compose_lyric_events(lyric_verses, options);

    if let Some(closing) = closing_event(verses, sentinel_at_end, audio_duration, options) {
        events.push(closing);
    }

    debug!(
        "由 {} 句歌词合成了 {} 个事件",
        verses.len(),
        events.len()
    );
    events
}

fn compose_lyric_events(verses: &[Verse], options: &CompositorOptions) -> Vec<Event> {
    let threshold = options.loader_threshold;
    let mut events = Vec::with_capacity(verses.len());
    let mut i = 0;

    while i < verses.len() {
        let verse = &verses[i];
        let gap_before = (i > 0).then(|| verse.start - verses[i - 1].end);

        if let Some(gap) = gap_before
            && gap >= threshold
            && let Some(filler) = filler_event(verses[i - 1].end, verse.start, options)
        {
            events.push(filler);
        }

        // 第一句总是带加载符号，之后只在长间隔后出现
        let has_loader = gap_before.is_none_or(|gap| gap >= threshold);
        let loader = has_loader.then_some(options.texts.loader.as_str());
        let display_start = if has_loader {
            (verse.start - LOADER_LEAD_SECONDS).max(0.0)
        } else {
            verse.start
        };

        if verse.words.is_empty() {
            warn!("{}s 处的句子没有任何单词，将生成空文本", verse.start);
        }

        match verses.get(i + 1) {
            Some(next) if next.start - verse.end < threshold => {
                if next.words.is_empty() {
                    warn!("{}s 处的句子没有任何单词，将生成空文本", next.start);
                }
                events.push(Event {
                    start: display_start,
                    end: next.end,
                    line_one: build_karaoke_line(&verse.words, loader),
                    line_two: Some(build_karaoke_line(&next.words, None)),
                    has_loader,
                    position: EventPosition::Standard,
                    kind: EventKind::Lyrics,
                    style: StyleName::Line2,
                    verses: vec![i, i + 1],
                });
                i += 2;
            }
            _ => {
                // 只有下一句很远或者已经是最后一句时才会单独显示，此时放在偏下居中的位置
                events.push(Event {
                    start: display_start,
                    end: verse.end,
                    line_one: build_karaoke_line(&verse.words, loader),
                    line_two: None,
                    has_loader,
                    position: EventPosition::LowerCenter,
                    kind: EventKind::Lyrics,
                    style: StyleName::Line2,
                    verses: vec![i],
                });
                i += 1;
            }
        }
    }

    events
}

fn filler_event(previous_end: f64, next_start: f64, options: &CompositorOptions) -> Option<Event> {
    let start = previous_end + FILLER_PADDING_SECONDS;
    let end = next_start - FILLER_PADDING_SECONDS;
    if end <= start {
        return None;
    }

    let mut text = String::from(r"{\fad(300,300)\c&HFFFFFF&}");
    text.push_str(&options.texts.filler);

    Some(Event {
        start,
        end,
        line_one: text,
        line_two: None,
        has_loader: false,
        position: EventPosition::Center,
        kind: EventKind::Filler,
        style: StyleName::Line2,
        verses: Vec::new(),
    })
}

fn closing_event(
    verses: &[Verse],
    sentinel_at_end: bool,
    audio_duration: f64,
    options: &CompositorOptions,
) -> Option<Event> {
    let (start, end) = match verses.last() {
        None => (0.0, audio_duration),
        Some(last) if sentinel_at_end => (last.start, audio_duration),
        Some(last) => (last.end, audio_duration),
    };

    if end <= start {
        debug!("歌词一直持续到音频结束，不添加致谢事件");
        return None;
    }

    let text = format!(r"{{\fad(300,0)}}{}", options.texts.closing);

    Some(Event {
        start,
        end,
        line_one: text,
        line_two: None,
        has_loader: false,
        position: EventPosition::Standard,
        kind: EventKind::Closing,
        style: StyleName::Line1,
        verses: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(start: f64, end: f64, words: &[(&str, f64, f64)]) -> Verse {
        Verse::new(
            start,
            end,
            words
                .iter()
                .map(|(t, s, e)| Word::new(*t, *s, *e))
                .collect(),
        )
    }

    /// 两个单词平分整句的时长。
    fn simple_verse(start: f64, end: f64) -> Verse {
        let mid = (start + end) / 2.0;
        verse(start, end, &[("la", start, mid), ("la", mid, end)])
    }

    fn lyrics(events: &[Event]) -> Vec<&Event> {
        events.iter().filter(|e| e.kind == EventKind::Lyrics).collect()
    }

    #[test]
    fn test_highlight_tags_equal_word_durations() {
        let words = vec![Word::new("a", 0.0, 0.5), Word::new("b", 0.5, 1.3)];
        let line = build_karaoke_line(&words, None);
        assert_eq!(line, r"{\fad(300,0)}{\kf50}a {\kf80}b");
    }

    #[test]
    fn test_highlight_has_no_minimum_clamp() {
        assert_eq!(highlight_centiseconds(&Word::new("x", 1.0, 1.004)), 0);
        assert_eq!(highlight_centiseconds(&Word::new("x", 1.0, 1.006)), 1);
    }

    #[test]
    fn test_loader_is_prepended() {
        let words = vec![Word::new("a", 3.0, 3.5)];
        let line = build_karaoke_line(&words, Some("➤➤➤➤"));
        assert_eq!(line, r"{\fad(300,0)}{\kf200}➤➤➤➤ {\kf50}a");
    }

    #[test]
    fn test_empty_words_produce_empty_body() {
        assert_eq!(build_karaoke_line(&[], None), "");
        let events = compose_events(&[verse(10.0, 12.0, &[])], 20.0, &CompositorOptions::default());
        assert_eq!(events[0].line_one, r"{\fad(300,0)}{\kf200}➤➤➤➤");
    }

    #[test]
    fn test_close_verses_are_merged() {
        let verses = vec![simple_verse(10.0, 12.0), simple_verse(13.0, 15.0)];
        let events = compose_events(&verses, 15.0, &CompositorOptions::default());

        assert_eq!(events.len(), 1);
        let merged = &events[0];
        assert_eq!(merged.start, 8.0);
        assert_eq!(merged.end, 15.0);
        assert!(merged.has_loader);
        assert!(merged.line_one.contains("➤➤➤➤"));
        assert!(!merged.line_two.as_deref().unwrap().contains("➤➤➤➤"));
        assert_eq!(merged.position, EventPosition::Standard);
        assert!(merged.text().contains(r"\N"));
    }

    #[test]
    fn test_far_verses_get_filler_and_loader() {
        let verses = vec![simple_verse(10.0, 12.0), simple_verse(20.0, 22.0)];
        let events = compose_events(&verses, 22.0, &CompositorOptions::default());

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Lyrics);
        assert_eq!(events[1].kind, EventKind::Filler);
        assert!((events[1].start - 12.3).abs() < 1e-9);
        assert!((events[1].end - 19.7).abs() < 1e-9);
        assert_eq!(events[1].position, EventPosition::Center);
        assert!(events[1].line_one.ends_with("MELODI"));

        assert!(events[2].has_loader);
        assert_eq!(events[2].start, 18.0);
        assert_eq!(events[2].position, EventPosition::LowerCenter);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let verses = vec![simple_verse(10.0, 12.0), simple_verse(17.0, 19.0)];
        let events = compose_events(&verses, 19.0, &CompositorOptions::default());

        // 间隔正好等于阈值时不合并
        assert_eq!(lyrics(&events).len(), 2);
        assert!(events.iter().any(|e| e.kind == EventKind::Filler));
    }

    #[test]
    fn test_filler_skipped_when_span_is_empty() {
        let options = CompositorOptions {
            loader_threshold: 0.5,
            ..Default::default()
        };
        let verses = vec![simple_verse(10.0, 12.0), simple_verse(12.55, 14.0)];
        let events = compose_events(&verses, 14.0, &options);

        assert!(events.iter().all(|e| e.kind != EventKind::Filler));
        assert_eq!(lyrics(&events).len(), 2);
    }

    #[test]
    fn test_loader_start_is_floored_at_zero() {
        let verses = vec![simple_verse(0.5, 2.0)];
        let events = compose_events(&verses, 2.0, &CompositorOptions::default());
        assert_eq!(events[0].start, 0.0);
    }

    #[test]
    fn test_no_loader_after_short_gap() {
        let verses = vec![
            simple_verse(10.0, 12.0),
            simple_verse(13.0, 15.0),
            simple_verse(16.0, 18.0),
        ];
        let events = compose_events(&verses, 18.0, &CompositorOptions::default());
        let lyric_events = lyrics(&events);

        assert_eq!(lyric_events.len(), 2);
        assert!(!lyric_events[1].has_loader);
        assert_eq!(lyric_events[1].start, 16.0);
        assert!(!lyric_events[1].line_one.contains("➤"));
    }

    #[test]
    fn test_closing_for_empty_verses_spans_whole_audio() {
        let events = compose_events(&[], 120.0, &CompositorOptions::default());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Closing);
        assert_eq!((events[0].start, events[0].end), (0.0, 120.0));
        assert_eq!(events[0].line_one, r"{\fad(300,0)}Teşekkür Ederiz");
        assert_eq!(events[0].style, StyleName::Line1);
    }

    #[test]
    fn test_closing_fills_gap_after_last_verse() {
        let verses = vec![simple_verse(100.0, 105.0)];
        let events = compose_events(&verses, 130.0, &CompositorOptions::default());
        let closing = events.last().unwrap();

        assert_eq!(closing.kind, EventKind::Closing);
        assert_eq!((closing.start, closing.end), (105.0, 130.0));
    }

    #[test]
    fn test_closing_skipped_without_gap() {
        let verses = vec![simple_verse(100.0, 130.0)];
        let events = compose_events(&verses, 130.0, &CompositorOptions::default());
        assert!(events.iter().all(|e| e.kind != EventKind::Closing));
    }

    #[test]
    fn test_closing_replaces_sentinel_verse() {
        let verses = vec![
            simple_verse(100.0, 105.0),
            verse(
                120.0,
                124.0,
                &[("Altyazı", 120.0, 121.0), ("M", 121.0, 122.0), (".K.", 122.0, 124.0)],
            ),
        ];
        let events = compose_events(&verses, 130.0, &CompositorOptions::default());
        let closing = events.last().unwrap();

        assert_eq!(closing.kind, EventKind::Closing);
        assert_eq!((closing.start, closing.end), (120.0, 130.0));
        assert!(events.iter().all(|e| !e.text().contains("Altyazı")));
    }

    #[test]
    fn test_three_verse_end_to_end() {
        // 第一、二句间隔 2 秒，第二、三句间隔 8 秒
        let verses = vec![
            verse(10.0, 12.0, &[("bir", 10.0, 11.0), ("iki", 11.0, 12.0)]),
            verse(14.0, 16.0, &[("üç", 14.0, 15.0), ("dört", 15.0, 16.0)]),
            verse(24.0, 26.0, &[("beş", 24.0, 25.0), ("altı", 25.0, 26.0)]),
        ];
        let events = compose_events(&verses, 30.0, &CompositorOptions::default());
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                EventKind::Lyrics,
                EventKind::Filler,
                EventKind::Lyrics,
                EventKind::Closing
            ]
        );

        let merged = &events[0];
        assert_eq!((merged.start, merged.end), (8.0, 16.0));
        assert!(merged.line_one.contains("bir"));
        assert!(merged.line_two.as_deref().unwrap().contains("dört"));

        let filler = &events[1];
        assert!((filler.start - 16.3).abs() < 1e-9);
        assert!((filler.end - 23.7).abs() < 1e-9);

        let last = &events[2];
        assert!(last.has_loader);
        assert_eq!(last.start, 22.0);
        assert_eq!(last.end, 26.0);
        assert_eq!(last.position, EventPosition::LowerCenter);
        assert_eq!(last.line_one, r"{\fad(300,0)}{\kf200}➤➤➤➤ {\kf100}beş {\kf100}altı");

        assert_eq!((events[3].start, events[3].end), (26.0, 30.0));
    }

    #[test]
    fn test_merged_pair_after_long_gap_gets_loader_on_upper_line() {
        let verses = vec![
            simple_verse(10.0, 12.0),
            simple_verse(20.0, 22.0),
            simple_verse(23.0, 25.0),
        ];
        let events = compose_events(&verses, 25.0, &CompositorOptions::default());
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![EventKind::Lyrics, EventKind::Filler, EventKind::Lyrics]
        );

        let filler = &events[1];
        assert!((filler.start - 12.3).abs() < 1e-9);
        assert!((filler.end - 19.7).abs() < 1e-9);
        assert!(filler.verses.is_empty());

        let merged = &events[2];
        assert!(merged.has_loader);
        assert_eq!((merged.start, merged.end), (18.0, 25.0));
        assert!(merged.line_one.contains("➤➤➤➤"));
        assert!(!merged.line_two.as_deref().unwrap().contains("➤"));
        assert_eq!(merged.position, EventPosition::Standard);
        assert_eq!(merged.verses, vec![1, 2]);
        assert_eq!(events[0].verses, vec![0]);
    }
}
