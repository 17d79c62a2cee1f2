//! 字幕合成前后的处理器模块

pub mod color_resolver;
pub mod verse_filter;
