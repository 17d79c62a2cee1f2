//! 字幕解析器模块

pub mod ass_parser;
