//! 歌词与歌曲元数据模型。

pub mod metadata;
pub mod verse;

pub use metadata::SongMetadata;
pub use verse::{Verse, Word};
