use super::types::{NodeKind, OutlineNode};

/// 层级与区间组装
///
/// 输入是按文档顺序发现的节点（`end_position` 尚未确定），输出补全区间：
/// - 章节：结束于下一个节点（任意类型）的起点，最后一个结束于全文末尾
/// - 分卷：结束于下一个分卷的起点，因此包含其下所有章节
pub struct HierarchyAssembler {
    total_length: usize,
}

impl HierarchyAssembler {
    pub fn new(total_length: usize) -> Self {
        Self { total_length }
    }

    pub fn assemble(&self, mut nodes: Vec<OutlineNode>) -> Vec<OutlineNode> {
        let mut next_any = self.total_length;
        let mut next_volume = self.total_length;

        // 倒序遍历，一次即可同时得到"下一个节点"和"下一个分卷"
        for node in nodes.iter_mut().rev() {
            node.end_position = match node.kind {
                NodeKind::Chapter => next_any,
                NodeKind::Volume => next_volume,
            };
            if node.kind == NodeKind::Volume {
                next_volume = node.start_position;
            }
            next_any = node.start_position;
        }

        self.relink_parents(&mut nodes);
        nodes
    }

    /// 章节的父节点是它之前最近的分卷
    fn relink_parents(&self, nodes: &mut [OutlineNode]) {
        let mut current_volume = None;
        for (index, node) in nodes.iter_mut().enumerate() {
            match node.kind {
                NodeKind::Volume => current_volume = Some(index),
                NodeKind::Chapter => node.parent_id = current_volume,
            }
        }
    }
}
