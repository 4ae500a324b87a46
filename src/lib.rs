// Deep Reader 目录解析库
// 文本解码、章节/分卷目录提取、书籍与目录的本地存储、阅读进度与笔记

pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod logging;
pub mod outline;
pub mod parser;

pub use config::ExtractorConfig;
pub use db::{BookRecord, Note, NoteDraft, NoteKind, NoteUpdate, ReadingRecord};
pub use error::{ReaderError, ReaderResult};
pub use library::{ContentSlice, ImportOutcome, Library, ReadingProgress};
pub use outline::{extract_outline, NodeKind, OutlineExtractor, OutlineNode, OutlineResult};
pub use parser::{BookFormat, ParseOptions, ParseResult, Parser, ParserRouter};
