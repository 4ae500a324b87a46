use super::types::{NodeKind, OutlineNode};
use crate::config::ExtractorConfig;

/// 回退处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// 识别结果完整，无需回退
    None,
    /// 识别到章节但没有分卷：补一个默认分卷
    DefaultVolume,
    /// 没有识别到章节：按固定窗口切分（保留已识别的分卷）
    FixedWindow,
}

/// 回退策略
///
/// 保证任何非空文本都能得到可用的目录：
/// 1. 有章节无分卷：生成覆盖全文的默认分卷，所有章节挂到其下
/// 2. 无章节：每个分卷内每 `window` 个字符一章；没有分卷覆盖的开头部分归入默认分卷
/// 3. 有真实章节时绝不用合成章节替换
pub struct FallbackStrategy {
    window: usize,
    volume_title: String,
}

impl FallbackStrategy {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            window: config.fallback_window.max(1),
            volume_title: config.default_volume_title.clone(),
        }
    }

    /// 判断需要哪种回退
    pub fn decide(&self, nodes: &[OutlineNode], total_length: usize) -> FallbackKind {
        if total_length == 0 {
            return FallbackKind::None;
        }
        let has_volume = nodes.iter().any(|n| n.is_volume());
        let has_chapter = nodes.iter().any(|n| n.is_chapter());
        match (has_volume, has_chapter) {
            (_, false) => FallbackKind::FixedWindow,
            (false, true) => FallbackKind::DefaultVolume,
            (true, true) => FallbackKind::None,
        }
    }

    /// 应用回退策略
    ///
    /// # 参数
    /// - `nodes`: 已组装好区间的节点
    /// - `total_length`: 全文字符数
    /// - `line_starts`: 每一行的起始字符偏移，用于计算合成章节的行号
    ///
    /// # 返回
    /// (最终节点, 使用的回退方式)
    pub fn apply(
        &self,
        nodes: Vec<OutlineNode>,
        total_length: usize,
        line_starts: &[usize],
    ) -> (Vec<OutlineNode>, FallbackKind) {
        let kind = self.decide(&nodes, total_length);
        let nodes = match kind {
            FallbackKind::None => nodes,
            FallbackKind::DefaultVolume => self.attach_default_volume(nodes, total_length),
            FallbackKind::FixedWindow => self.split_fixed_window(nodes, total_length, line_starts),
        };
        (nodes, kind)
    }

    fn default_volume(&self, end_position: usize) -> OutlineNode {
        OutlineNode {
            kind: NodeKind::Volume,
            sequence_id: 1,
            title: self.volume_title.clone(),
            parent_id: None,
            start_position: 0,
            end_position,
            start_line: 0,
            synthetic: true,
        }
    }

    fn attach_default_volume(&self, chapters: Vec<OutlineNode>, total_length: usize) -> Vec<OutlineNode> {
        let mut nodes = Vec::with_capacity(chapters.len() + 1);
        nodes.push(self.default_volume(total_length));
        nodes.extend(chapters.into_iter().map(|mut chapter| {
            chapter.parent_id = Some(0);
            chapter
        }));
        nodes
    }

    /// 按固定窗口在每个分卷内切分章节
    ///
    /// `volumes` 为已组装好区间的真实分卷（可以为空）。第一个分卷之前的文本
    /// 放入默认分卷，窗口不跨越分卷边界，章节序号全书连续。
    fn split_fixed_window(
        &self,
        volumes: Vec<OutlineNode>,
        total_length: usize,
        line_starts: &[usize],
    ) -> Vec<OutlineNode> {
        let first_start = volumes.first().map_or(total_length, |v| v.start_position);
        let mut regions = Vec::with_capacity(volumes.len() + 1);
        if first_start > 0 {
            regions.push(self.default_volume(first_start));
        }
        regions.extend(volumes);

        let estimated = total_length.div_ceil(self.window) + regions.len();
        let mut nodes = Vec::with_capacity(estimated + regions.len());
        let mut sequence_id = 0u32;

        for volume in regions {
            let parent = nodes.len();
            let (mut start, end) = (volume.start_position, volume.end_position);
            nodes.push(volume);

            while start < end {
                let stop = (start + self.window).min(end);
                sequence_id = sequence_id.saturating_add(1);
                nodes.push(OutlineNode {
                    kind: NodeKind::Chapter,
                    sequence_id,
                    title: NodeKind::Chapter.fallback_title(sequence_id),
                    parent_id: Some(parent),
                    start_position: start,
                    end_position: stop,
                    start_line: line_at(line_starts, start),
                    synthetic: true,
                });
                start = stop;
            }
        }
        nodes
    }
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

/// 给定字符偏移所在的行号
fn line_at(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset).saturating_sub(1)
}
