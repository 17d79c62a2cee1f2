//! ASS 格式解析器
//!
//! 只读取 `[Events]` 中的 `Dialogue` 行。修改时间时，文件的其余部分（包括样式和文本）原样保留。

use std::collections::HashMap;

use tracing::warn;

use crate::subtitle::time::{seconds_to_timestamp, timestamp_to_seconds};

const DIALOGUE_PREFIX: &str = "Dialogue:";
/// `Dialogue` 行的字段数 (Layer 到 Text)。
const DIALOGUE_FIELD_COUNT: usize = 10;

/// 解析后的一行 `Dialogue`。
///
/// 除了时间外，其余字段都保留原始文本，便于原样写回。
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    /// 图层
    pub layer: String,
    /// 开始时间（秒）
    pub start: f64,
    /// 结束时间（秒）
    pub end: f64,
    /// 样式名
    pub style: String,
    /// 角色名
    pub name: String,
    /// 左边距
    pub margin_l: String,
    /// 右边距
    pub margin_r: String,
    /// 垂直边距
    pub margin_v: String,
    /// 特效
    pub effect: String,
    /// 文本，可能包含覆盖标签，也可能包含逗号
    pub text: String,
}

impl DialogueLine {
    /// 去掉覆盖标签 `{...}` 后的纯文本，`\N` 转换为空格。
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut plain = String::with_capacity(self.text.len());
        let mut depth = 0usize;
        for c in self.text.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ if depth == 0 => plain.push(c),
                _ => {}
            }
        }
        plain.replace(r"\N", " ").trim().to_string()
    }

    /// 转换回 ASS 文本行（不含换行符）。
    #[must_use]
    pub fn to_ass_line(&self) -> String {
        format!(
            "{DIALOGUE_PREFIX} {},{},{},{},{},{},{},{},{},{}",
            self.layer,
            seconds_to_timestamp(self.start),
            seconds_to_timestamp(self.end),
            self.style,
            self.name,
            self.margin_l,
            self.margin_r,
            self.margin_v,
            self.effect,
            self.text
        )
    }
}

/// 解析一行 `Dialogue`。
///
/// 不是 `Dialogue` 行或字段少于 10 个时返回 `None`。时间戳格式错误时按 `0.0` 处理。
#[must_use]
pub fn parse_dialogue_line(line: &str) -> Option<DialogueLine> {
    let rest = line.trim_start().strip_prefix(DIALOGUE_PREFIX)?;
    let fields: Vec<&str> = rest.splitn(DIALOGUE_FIELD_COUNT, ',').collect();
    let [layer, start, end, style, name, margin_l, margin_r, margin_v, effect, text] =
        fields.as_slice()
    else {
        return None;
    };

    Some(DialogueLine {
        layer: layer.trim().to_string(),
        start: timestamp_to_seconds(start),
        end: timestamp_to_seconds(end),
        style: (*style).to_string(),
        name: (*name).to_string(),
        margin_l: (*margin_l).to_string(),
        margin_r: (*margin_r).to_string(),
        margin_v: (*margin_v).to_string(),
        effect: (*effect).to_string(),
        text: text.trim_end_matches(['\r', '\n']).to_string(),
    })
}

/// 按出现顺序解析文档中的所有 `Dialogue` 行。字段不全的行会被跳过。
#[must_use]
pub fn parse_dialogues(content: &str) -> Vec<DialogueLine> {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with(DIALOGUE_PREFIX))
        .filter_map(|line| {
            let parsed = parse_dialogue_line(line);
            if parsed.is_none() {
                warn!("跳过字段不全的 Dialogue 行: '{}'", line.trim());
            }
            parsed
        })
        .collect()
}

/// 改写指定序号 (从 0 开始，按 `Dialogue` 行计数) 的开始和结束时间。
///
/// 只替换时间字段，其余内容和行尾保持不变。返回新的文档内容和实际改写的行数。
#[must_use]
pub fn retime_dialogues(content: &str, timings: &HashMap<usize, (f64, f64)>) -> (String, usize) {
    let mut output = String::with_capacity(content.len());
    let mut dialogue_index = 0usize;
    let mut rewritten = 0usize;

    for raw_line in content.split_inclusive('\n') {
        let body = raw_line.trim_end_matches(['\r', '\n']);
        let line_ending = &raw_line[body.len()..];

        if !body.trim_start().starts_with(DIALOGUE_PREFIX) {
            output.push_str(raw_line);
            continue;
        }

        let current = dialogue_index;
        dialogue_index += 1;

        match (timings.get(&current), parse_dialogue_line(body)) {
            (Some(&(start, end)), Some(mut dialogue)) => {
                dialogue.start = start;
                dialogue.end = end;
                output.push_str(&dialogue.to_ass_line());
                output.push_str(line_ending);
                rewritten += 1;
            }
            _ => output.push_str(raw_line),
        }
    }

    (output, rewritten)
}

/// 保留前 `keep` 行 `Dialogue`，其余的 `Dialogue` 行整体替换为 `replacement`。
///
/// `replacement` 放在第一行被替换的位置，没有可替换的行时追加到文档末尾。
/// 原文使用 CRLF 时，`replacement` 的换行也转换为 CRLF。
#[must_use]
pub fn replace_dialogues(content: &str, keep: usize, replacement: &str) -> String {
    let crlf = content.contains("\r\n");
    let replacement = if crlf {
        replacement.replace("\r\n", "\n").replace('\n', "\r\n")
    } else {
        replacement.to_string()
    };

    let mut output = String::with_capacity(content.len() + replacement.len());
    let mut dialogue_index = 0usize;
    let mut inserted = false;

    for raw_line in content.split_inclusive('\n') {
        if !raw_line.trim_start().starts_with(DIALOGUE_PREFIX) {
            output.push_str(raw_line);
            continue;
        }

        let current = dialogue_index;
        dialogue_index += 1;
        if current < keep {
            output.push_str(raw_line);
        } else if !inserted {
            output.push_str(&replacement);
            inserted = true;
        }
    }

    if !inserted {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push_str(if crlf { "\r\n" } else { "\n" });
        }
        output.push_str(&replacement);
    }
    output
}
