//! 定义了字幕合成中使用的核心数据类型。

use std::{fmt, io};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

//=============================================================================
// 1. 错误枚举
//=============================================================================

/// 定义字幕合成和读写过程中可能发生的各种错误。
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// 字符串格式化错误。
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// JSON 解析错误。
    #[error("解析 JSON 内容 {context} 失败: {source}")]
    JsonParse {
        /// 底层 `serde_json` 错误
        #[source]
        source: serde_json::Error,
        /// 有关错误发生位置的上下文信息。
        context: String,
    },
}

impl SubtitleError {
    /// 创建一个带有上下文的 `JsonParse` 错误。
    #[must_use]
    pub fn json_parse(source: serde_json::Error, context: String) -> Self {
        Self::JsonParse { source, context }
    }
}

//=============================================================================
// 2. 事件结构
//=============================================================================

/// 字幕事件的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventKind {
    /// 由一句或两句歌词组成的普通事件
    #[default]
    Lyrics,
    /// 长间奏期间显示的占位事件
    Filler,
    /// 歌曲结束时的致谢事件
    Closing,
}

/// 事件在画面中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventPosition {
    /// 使用样式自带的位置
    #[default]
    Standard,
    /// 画面正中 (`\an5`)
    Center,
    /// 偏下居中 (`\an8`)
    LowerCenter,
}

impl EventPosition {
    /// 返回需要前置到文本的覆盖标签，标准位置不需要标签。
    #[must_use]
    pub fn override_tag(self) -> &'static str {
        match self {
            EventPosition::Standard => "",
            EventPosition::Center => r"{\an5}",
            EventPosition::LowerCenter => r"{\an8}",
        }
    }
}

/// 字幕文件中定义的三个样式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum StyleName {
    /// 上方的活动行
    Line1,
    /// 下方的活动行
    Line2,
    /// 等待中的下一行
    NextLine,
}

/// 屏幕上的一个显示单元，由一句或两句连续的歌词生成。
///
/// 文本中已经内嵌了 `\kf` 高亮时长标签。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 显示开始时间（秒）
    pub start: f64,
    /// 显示结束时间（秒）
    pub end: f64,
    /// 上行文本
    pub line_one: String,
    /// 下行文本，单句事件为 `None`
    pub line_two: Option<String>,
    /// 是否带有加载符号
    pub has_loader: bool,
    /// 显示位置
    pub position: EventPosition,
    /// 事件种类
    pub kind: EventKind,
    /// 使用的样式
    pub style: StyleName,
    /// 生成该事件的歌词序号，占位和致谢事件为空
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verses: Vec<usize>,
}

impl Event {
    /// 以 ASS 的 `\N` 换行标记拼接两行文本。
    #[must_use]
    pub fn text(&self) -> String {
        match &self.line_two {
            Some(lower) => format!(r"{}\N{}", self.line_one, lower),
            None => self.line_one.clone(),
        }
    }
}

//=============================================================================
// 3. 选项
//=============================================================================

/// 合成器使用的固定文本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTexts {
    /// 间奏占位文本
    pub filler: String,
    /// 结尾致谢文本
    pub closing: String,
    /// 如果最后一句包含此短语，就用致谢文本替换它
    pub closing_sentinel: String,
    /// 加载符号
    pub loader: String,
}

impl Default for EventTexts {
    fn default() -> Self {
        Self {
            filler: "MELODI".to_string(),
            closing: "Teşekkür Ederiz".to_string(),
            closing_sentinel: "Altyazı M .K.".to_string(),
            loader: "➤➤➤➤".to_string(),
        }
    }
}

/// 事件合成器的选项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorOptions {
    /// 两句歌词之间的间隔达到此值（秒）时，不再合并并插入加载符号
    pub loader_threshold: f64,
    /// 固定文本
    pub texts: EventTexts,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            loader_threshold: 5.0,
            texts: EventTexts::default(),
        }
    }
}

/// ASS 文档的样式参数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssStyleOptions {
    /// 歌词字体
    pub font: String,
    /// 标题中艺术家使用的字体
    pub artist_font: String,
    /// 标题中歌曲名使用的字体
    pub title_font: String,
    /// 字号
    pub fontsize: u32,
    /// 主色，可以是颜色名或 `&H` 值
    pub primary_color: String,
    /// 次色
    pub secondary_color: String,
    /// 描边色
    pub outline_color: String,
    /// 描边宽度
    pub outline_size: u32,
    /// 阴影色
    pub shadow_color: String,
    /// 阴影大小
    pub shadow_size: u32,
    /// 画面宽度
    pub screen_width: u32,
    /// 画面高度
    pub screen_height: u32,
}

impl Default for AssStyleOptions {
    fn default() -> Self {
        Self {
            font: "/app/fonts/Futura XBlkCnIt BT.ttf".to_string(),
            artist_font: "/app/fonts/Futura Md BT Bold.ttf".to_string(),
            title_font: "/app/fonts/Futura Heavy Italic.ttf".to_string(),
            fontsize: 60,
            primary_color: "Orange".to_string(),
            secondary_color: "White".to_string(),
            outline_color: "Light Blue".to_string(),
            outline_size: 3,
            shadow_color: "Light Blue".to_string(),
            shadow_size: 0,
            screen_width: 1280,
            screen_height: 720,
        }
    }
}

/// 生成字幕文件的完整选项。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SubtitleOptions {
    /// 样式参数
    pub style: AssStyleOptions,
    /// 合成器参数
    pub compositor: CompositorOptions,
    /// 输出文件名
    pub file_name: Option<String>,
    /// 是否覆盖已有的字幕文件
    pub overwrite: bool,
}
