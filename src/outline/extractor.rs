use super::assembler::HierarchyAssembler;
use super::chapter_detector::ChapterDetector;
use super::fallback::{FallbackKind, FallbackStrategy};
use super::line_segmenter::LineSegmenter;
use super::numeral::NumeralConverter;
use super::types::{LineRecord, NodeKind, OutlineNode, OutlineResult};
use crate::config::ExtractorConfig;

/// 章节/分卷目录提取器
///
/// 自身只持有只读配置和共享的模式表；计数器与数字缓存在每次调用时新建，
/// 因此同一个实例可以在多个线程中同时处理不同的书。
pub struct OutlineExtractor {
    config: ExtractorConfig,
    detector: &'static ChapterDetector,
    segmenter: LineSegmenter,
}

impl OutlineExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        let segmenter = LineSegmenter::new(config.min_title_chars, config.max_title_chars);
        Self {
            config,
            detector: ChapterDetector::shared(),
            segmenter,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// 提取目录
    ///
    /// 空文本返回空目录；其余任何输入都至少得到一个节点，不会失败。
    pub fn extract(&self, text: &str) -> OutlineResult {
        let records = self.segmenter.segment(text);
        let total_length = records
            .last()
            .map(|r| r.next_offset())
            .unwrap_or(0);
        if total_length == 0 {
            return OutlineResult::default();
        }

        let mut run = ExtractionRun::new(self.detector);
        let mut candidates = 0usize;
        for record in records.iter().filter(|r| self.segmenter.is_candidate(r)) {
            candidates += 1;
            run.observe(record);
        }
        let matched = run.nodes.len();
        let cached_tokens = run.numerals.cached_tokens();

        let nodes = HierarchyAssembler::new(total_length).assemble(run.nodes);
        let line_starts: Vec<usize> = records.iter().map(|r| r.start_offset).collect();
        let (nodes, fallback) =
            FallbackStrategy::new(&self.config).apply(nodes, total_length, &line_starts);

        tracing::debug!(
            total_length,
            lines = records.len(),
            candidates,
            matched,
            cached_tokens,
            "目录提取完成"
        );
        match fallback {
            FallbackKind::None => {}
            FallbackKind::DefaultVolume => {
                tracing::debug!("未识别到分卷，已生成默认分卷");
            }
            FallbackKind::FixedWindow => {
                tracing::warn!(
                    window = self.config.fallback_window,
                    chapters = nodes.iter().filter(|n| n.is_chapter()).count(),
                    "未识别到任何章节，按固定窗口切分"
                );
            }
        }

        OutlineResult { nodes, total_length }
    }
}

impl Default for OutlineExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 单次提取的可变状态
struct ExtractionRun {
    detector: &'static ChapterDetector,
    numerals: NumeralConverter,
    volume_seq: u32,
    chapter_seq: u32,
    current_volume: Option<usize>,
    nodes: Vec<OutlineNode>,
}

impl ExtractionRun {
    fn new(detector: &'static ChapterDetector) -> Self {
        Self {
            detector,
            numerals: NumeralConverter::new(),
            volume_seq: 0,
            chapter_seq: 0,
            current_volume: None,
            nodes: Vec::new(),
        }
    }

    fn next_counter(&mut self, kind: NodeKind) -> u32 {
        let counter = match kind {
            NodeKind::Volume => &mut self.volume_seq,
            NodeKind::Chapter => &mut self.chapter_seq,
        };
        *counter += 1;
        *counter
    }

    fn observe(&mut self, record: &LineRecord<'_>) {
        let Some(found) = self.detector.detect_explicit(record.trimmed_text) else {
            return;
        };

        let counter = self.next_counter(found.kind);
        let sequence_id = found
            .numeral
            .and_then(|token| self.numerals.convert(token))
            .unwrap_or(counter);
        let title = found
            .clean_subtitle()
            .or_else(|| found.label.map(str::to_string))
            .unwrap_or_else(|| found.kind.fallback_title(sequence_id));

        let parent_id = match found.kind {
            NodeKind::Volume => None,
            NodeKind::Chapter => self.current_volume,
        };
        if found.kind == NodeKind::Volume {
            self.current_volume = Some(self.nodes.len());
        }

        tracing::trace!(
            kind = found.kind.as_str(),
            pattern = found.pattern,
            sequence_id,
            line = record.line_index,
            "识别到标题"
        );

        self.nodes.push(OutlineNode {
            kind: found.kind,
            sequence_id,
            title,
            parent_id,
            start_position: record.start_offset,
            end_position: record.start_offset,
            start_line: record.line_index,
            synthetic: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_fallback_for_unparsed_numerals() {
        let text = "第二十三章 甲\n内容\n第二十四章 乙\n内容";
        let outline = OutlineExtractor::new().extract(text);
        let seqs: Vec<_> = outline.chapters().map(|c| c.sequence_id).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_counters_are_per_kind() {
        let text = "第一卷 山\n第五章 甲\n第二卷 水\n序章\n";
        let outline = OutlineExtractor::new().extract(text);

        let volumes: Vec<_> = outline.volumes().map(|v| (v.sequence_id, v.title.as_str())).collect();
        assert_eq!(volumes, vec![(1, "山"), (2, "水")]);

        let chapters: Vec<_> = outline.chapters().map(|c| (c.sequence_id, c.title.as_str())).collect();
        // 序章没有数字，使用章节计数器（第 2 个章节）
        assert_eq!(chapters, vec![(5, "甲"), (2, "序章")]);
    }

    #[test]
    fn test_fallback_title_uses_sequence() {
        let outline = OutlineExtractor::new().extract("第七章\n正文\n第三卷\n");
        let titles: Vec<_> = outline.nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["第7章", "第3卷"]);
    }

    #[test]
    fn test_extractor_is_reusable() {
        let extractor = OutlineExtractor::new();
        let first = extractor.extract("第一章 甲\n内容");
        let second = extractor.extract("第一章 甲\n内容");
        assert_eq!(first, second);
    }
}
