// 章节/分卷目录提取
// 从解码后的纯文本中恢复带字符偏移的分卷、章节结构

pub mod types;
pub mod line_segmenter;
pub mod chapter_detector;
pub mod numeral;
pub mod assembler;
pub mod fallback;
pub mod extractor;

#[cfg(test)]
mod integration_tests;

// 重新导出主要类型
pub use types::*;
pub use line_segmenter::LineSegmenter;
pub use chapter_detector::{ChapterDetector, TitleMatch};
pub use numeral::{chinese_to_number, NumeralConverter};
pub use assembler::HierarchyAssembler;
pub use fallback::{FallbackKind, FallbackStrategy};
pub use extractor::OutlineExtractor;

/// 使用默认配置提取目录
pub fn extract_outline(text: &str) -> OutlineResult {
    OutlineExtractor::new().extract(text)
}
