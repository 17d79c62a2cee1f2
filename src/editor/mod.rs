//! 字幕和歌词时间的手动校正。

pub mod ass_editor;
pub mod timing_editor;

pub use ass_editor::{edit_with_external_editor, preview_ass_content};
pub use timing_editor::{SaveReport, TimingEditor, TimingRow};
