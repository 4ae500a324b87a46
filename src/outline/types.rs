use serde::{Deserialize, Serialize};

/// 目录节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Volume,
    Chapter,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Volume => "volume",
            NodeKind::Chapter => "chapter",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "volume" => Some(NodeKind::Volume),
            "chapter" => Some(NodeKind::Chapter),
            _ => None,
        }
    }

    /// 无法解析序号时使用的默认标题
    pub fn fallback_title(&self, sequence_id: u32) -> String {
        match self {
            NodeKind::Volume => format!("第{}卷", sequence_id),
            NodeKind::Chapter => format!("第{}章", sequence_id),
        }
    }
}

/// 行记录
///
/// 只在解析过程中使用。`start_offset` 是该行首字符（含前导空白）在原文中的字符偏移。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord<'a> {
    /// 原始行内容（未去空白，不含换行符）
    pub raw_text: &'a str,
    /// 去除首尾空白后的内容
    pub trimmed_text: &'a str,
    /// 行首字符偏移
    pub start_offset: usize,
    /// 换行符长度：0、1 或 2
    pub line_break_length: usize,
    /// 行号（从 0 开始）
    pub line_index: usize,
}

impl LineRecord<'_> {
    /// 原始行的字符数（不含换行符）
    pub fn char_len(&self) -> usize {
        self.raw_text.chars().count()
    }

    /// 去空白后的字符数
    pub fn trimmed_char_len(&self) -> usize {
        self.trimmed_text.chars().count()
    }

    /// 下一行的起始偏移
    pub fn next_offset(&self) -> usize {
        self.start_offset + self.char_len() + self.line_break_length
    }
}

/// 目录节点
///
/// `start_position`/`end_position` 是原文中的半开字符区间 `[start, end)`。
/// `parent_id` 是所属分卷在 `OutlineResult::nodes` 中的下标。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineNode {
    pub kind: NodeKind,
    pub sequence_id: u32,
    pub title: String,
    pub parent_id: Option<usize>,
    pub start_position: usize,
    pub end_position: usize,
    pub start_line: usize,
    /// 是否为回退生成的节点（非原文标记）
    pub synthetic: bool,
}

impl OutlineNode {
    pub fn is_volume(&self) -> bool {
        self.kind == NodeKind::Volume
    }

    pub fn is_chapter(&self) -> bool {
        self.kind == NodeKind::Chapter
    }

    /// 区间长度（字符数）
    pub fn len(&self) -> usize {
        self.end_position.saturating_sub(self.start_position)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start_position <= position && position < self.end_position
    }

    /// 从原文中截取该节点的内容
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        slice_chars(text, self.start_position, self.end_position)
    }
}

/// 目录解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResult {
    /// 按 `start_position` 排序的节点
    pub nodes: Vec<OutlineNode>,
    /// 原文字符总数
    pub total_length: usize,
}

impl OutlineResult {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn volumes(&self) -> impl Iterator<Item = &OutlineNode> {
        self.nodes.iter().filter(|n| n.is_volume())
    }

    pub fn chapters(&self) -> impl Iterator<Item = &OutlineNode> {
        self.nodes.iter().filter(|n| n.is_chapter())
    }

    pub fn volume_count(&self) -> usize {
        self.volumes().count()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters().count()
    }

    /// 按序号查找第一个匹配的章节（用于"跳转到第 N 章"）
    pub fn find_chapter(&self, sequence_id: u32) -> Option<&OutlineNode> {
        self.chapters().find(|n| n.sequence_id == sequence_id)
    }

    /// 某个分卷下的所有章节
    pub fn chapters_of(&self, volume_id: usize) -> impl Iterator<Item = &OutlineNode> {
        self.chapters().filter(move |n| n.parent_id == Some(volume_id))
    }

    /// 包含给定位置的章节
    pub fn chapter_at(&self, position: usize) -> Option<&OutlineNode> {
        self.chapters().find(|n| n.contains(position))
    }
}

/// 按字符偏移截取字符串，越界部分被截断
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let start_byte = char_to_byte(text, start);
    let end_byte = char_to_byte(text, end);
    &text[start_byte..end_byte]
}

/// 字符偏移转换为字节偏移，超出长度时返回字符串字节长度
fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
