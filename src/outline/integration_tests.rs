// 集成测试：完整的目录提取流程

use crate::config::ExtractorConfig;
use crate::outline::*;

/// 检查区间不变量：章节结束于下一个节点，同类节点起点严格递增，父分卷包含章节起点
fn assert_outline_invariants(text: &str, outline: &OutlineResult) {
    let total = text.chars().count();
    assert_eq!(outline.total_length, total);

    for node in &outline.nodes {
        assert!(node.start_position < node.end_position, "空区间: {:?}", node);
        assert!(node.end_position <= total);
    }

    let real: Vec<&OutlineNode> = outline.nodes.iter().filter(|n| !n.synthetic).collect();
    for (i, node) in real.iter().enumerate() {
        if node.is_chapter() {
            let expected = real.get(i + 1).map(|n| n.start_position).unwrap_or(total);
            assert_eq!(node.end_position, expected, "章节结束位置错误: {:?}", node);
        }
    }

    for kind in [NodeKind::Volume, NodeKind::Chapter] {
        let starts: Vec<usize> = outline
            .nodes
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.start_position)
            .collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]), "{:?} 起点未严格递增", kind);
    }

    for chapter in outline.chapters() {
        if let Some(parent) = chapter.parent_id {
            let volume = &outline.nodes[parent];
            assert!(volume.is_volume());
            assert!(volume.contains(chapter.start_position));
        }
    }
}

/// 阅读顺序上的区间（章节 + 分卷标题段）首尾相接
fn assert_reading_sequence_tiles(outline: &OutlineResult) {
    let real: Vec<&OutlineNode> = outline.nodes.iter().filter(|n| !n.synthetic).collect();
    for pair in real.windows(2) {
        let heading_end = if pair[0].is_chapter() {
            pair[0].end_position
        } else {
            pair[1].start_position
        };
        assert_eq!(heading_end, pair[1].start_position);
    }
    if let Some(last) = real.last() {
        assert_eq!(last.end_position, outline.total_length);
    }
}

#[test]
fn test_two_chapters_get_default_volume() {
    let text = "第一章 开始\n正文内容\n第二章 结束\n更多内容";
    let outline = extract_outline(text);

    assert_eq!(outline.volume_count(), 1);
    assert_eq!(outline.chapter_count(), 2);

    let volume = &outline.nodes[0];
    assert_eq!(volume.title, "正文");
    assert!(volume.synthetic);
    assert_eq!((volume.start_position, volume.end_position), (0, text.chars().count()));

    let chapters: Vec<&OutlineNode> = outline.chapters().collect();
    assert_eq!((chapters[0].sequence_id, chapters[0].title.as_str()), (1, "开始"));
    assert_eq!((chapters[1].sequence_id, chapters[1].title.as_str()), (2, "结束"));
    assert_eq!(chapters[0].start_position, 0);
    assert_eq!(chapters[0].end_position, 12);
    assert_eq!(chapters[1].start_position, 12);
    assert_eq!(chapters[1].end_position, text.chars().count());
    assert!(chapters.iter().all(|c| c.parent_id == Some(0)));

    assert_eq!(chapters[0].slice(text), "第一章 开始\n正文内容\n");
    assert_eq!(chapters[1].slice(text), "第二章 结束\n更多内容");
    assert_outline_invariants(text, &outline);
}

#[test]
fn test_no_markers_splits_by_window() {
    let line = "这是一段没有任何标题的普通叙述内容，用来填充篇幅。\n";
    let text: String = line.repeat(2_000).chars().take(25_000).collect();
    let outline = extract_outline(&text);

    assert_eq!(outline.volume_count(), 1);
    assert_eq!(outline.nodes[0].title, "正文");

    let chapters: Vec<(&str, usize, usize)> = outline
        .chapters()
        .map(|c| (c.title.as_str(), c.start_position, c.end_position))
        .collect();
    assert_eq!(
        chapters,
        vec![
            ("第1章", 0, 10_000),
            ("第2章", 10_000, 20_000),
            ("第3章", 20_000, 25_000),
        ]
    );
    assert!(outline.chapters().all(|c| c.parent_id == Some(0) && c.synthetic));
}

#[test]
fn test_fallback_count_matches_ceil() {
    for len in [1usize, 9_999, 10_000, 10_001, 34_567] {
        let text = "无".repeat(len);
        let outline = extract_outline(&text);
        assert_eq!(outline.volume_count(), 1);
        assert_eq!(outline.chapter_count(), len.div_ceil(10_000), "len = {}", len);
        assert_outline_invariants(&text, &outline);
    }
}

#[test]
fn test_empty_input() {
    let outline = extract_outline("");
    assert!(outline.is_empty());
    assert_eq!(outline.total_length, 0);
}

#[test]
fn test_numeral_scenario() {
    assert_eq!(chinese_to_number("一百二"), Some(120));
    for n in 0..500u32 {
        assert_eq!(chinese_to_number(&n.to_string()), Some(n));
    }
}

#[test]
fn test_volume_pattern_precedence() {
    let text = "第一篇 总论\n内容\n第二章 细节\n内容";
    let outline = extract_outline(text);

    assert_eq!(outline.nodes[0].kind, NodeKind::Volume);
    assert_eq!(outline.nodes[0].title, "总论");
    assert!(!outline.nodes[0].synthetic);
    assert_eq!(outline.volume_count(), 1);
    assert_eq!(outline.chapter_count(), 1);
}

#[test]
fn test_volumes_and_chapters() {
    let text = "第一卷 风起\n第一章 甲\n内容\n第二章 乙\n内容\n第二卷 云涌\n第三章 丙\n内容";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);
    assert_reading_sequence_tiles(&outline);

    assert_eq!(outline.volume_count(), 2);
    assert_eq!(outline.chapter_count(), 3);
    assert!(outline.nodes.iter().all(|n| !n.synthetic));

    let first_volume = outline.nodes.iter().position(|n| n.title == "风起").unwrap();
    let second_volume = outline.nodes.iter().position(|n| n.title == "云涌").unwrap();
    assert_eq!(outline.chapters_of(first_volume).count(), 2);
    assert_eq!(outline.chapters_of(second_volume).count(), 1);

    // 第二章结束于第二卷标题处
    let chapter_two = outline.find_chapter(2).unwrap();
    assert_eq!(chapter_two.end_position, outline.nodes[second_volume].start_position);
    assert_eq!(outline.nodes[first_volume].end_position, outline.nodes[second_volume].start_position);
}

#[test]
fn test_chapters_before_first_volume_have_no_parent() {
    let text = "序章 往事\n内容\n第一卷 开端\n第一章 甲\n内容";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);

    let prologue = outline.chapters().next().unwrap();
    assert_eq!(prologue.title, "往事");
    assert_eq!(prologue.parent_id, None);
    assert_eq!(outline.chapters().nth(1).unwrap().parent_id, Some(1));
}

#[test]
fn test_crlf_offsets_are_character_accurate() {
    let text = "第一章 开始\r\n正文\r\n第二章 结束\r\n尾声\r\n";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);

    let chapters: Vec<&OutlineNode> = outline.chapters().collect();
    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters[1].start_position, 12);
    assert_eq!(chapters[0].slice(text), "第一章 开始\r\n正文\r\n");
    assert_eq!(chapters[2].title, "尾声");
}

#[test]
fn test_bare_carriage_returns() {
    let text = "Chapter 1: Dawn\rtext\rChapter 2\rmore";
    let outline = extract_outline(text);
    let chapters: Vec<&OutlineNode> = outline.chapters().collect();

    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Dawn");
    assert_eq!(chapters[1].title, "第2章");
    assert_eq!(chapters[1].start_position, 21);
    assert_eq!(chapters[1].start_line, 2);
}

#[test]
fn test_chapter_slices_rebuild_text() {
    let text = "  第一章 开始\n\u{3000}\u{3000}他走了。\n第二章 归来\r\n她来了。\r第三章\n";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);

    let rebuilt: String = outline.chapters().map(|c| c.slice(text)).collect();
    assert_eq!(rebuilt, text);
    // 起点包含标题行的前导空白
    assert_eq!(outline.chapters().next().unwrap().start_position, 0);
}

#[test]
fn test_preamble_is_covered_by_default_volume() {
    let text = "某某小说\n作者：佚名\n\n第一章 开始\n内容";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);

    let volume = &outline.nodes[0];
    assert_eq!(volume.start_position, 0);
    let chapter = outline.chapters().next().unwrap();
    assert!(chapter.start_position > 0);
    assert!(volume.contains(chapter.start_position));
    assert_eq!(chapter.start_line, 3);
}

#[test]
fn test_long_lines_are_not_titles() {
    let long_title = format!("第一章 {}", "很长".repeat(30));
    let text = format!("{}\n内容", long_title);
    let outline = extract_outline(&text);

    // 超过 50 个字符的行不参与匹配，回退为固定窗口
    assert!(outline.chapters().all(|c| c.synthetic));
}

#[test]
fn test_custom_config() {
    let config = ExtractorConfig {
        fallback_window: 5,
        default_volume_title: "全文".to_string(),
        ..ExtractorConfig::default()
    };
    let outline = OutlineExtractor::with_config(config).extract("没有标题的十二个字正文内容");

    assert_eq!(outline.nodes[0].title, "全文");
    assert_eq!(outline.chapter_count(), 3);
}

#[test]
fn test_mixed_numbering_styles() {
    let text = [
        "1. 出发", "内容", "第2章 路上", "内容", "3 相遇", "内容",
        "四章 离别", "内容", "Chapter 5: Home", "内容", "后记", "内容",
    ]
    .join("\n");
    let outline = extract_outline(&text);
    assert_outline_invariants(&text, &outline);

    let chapters: Vec<(u32, &str)> = outline
        .chapters()
        .map(|c| (c.sequence_id, c.title.as_str()))
        .collect();
    assert_eq!(
        chapters,
        vec![(1, "出发"), (2, "路上"), (3, "相遇"), (4, "离别"), (5, "Home"), (6, "后记")]
    );
}

#[test]
fn test_concurrent_extraction() {
    let extractor = OutlineExtractor::new();
    let extractor = &extractor;
    let texts: Vec<String> = (1..=4)
        .map(|n| {
            (1..=n * 10)
                .map(|i| format!("第{}章 标题{}\n正文{}\n", i, i, i))
                .collect::<String>()
        })
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = texts
            .iter()
            .map(|text| scope.spawn(move || extractor.extract(text)))
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            let outline = handle.join().unwrap();
            assert_eq!(outline.chapter_count(), (n + 1) * 10);
            assert_outline_invariants(&texts[n], &outline);
        }
    });
}

#[test]
fn test_large_book() {
    let text: String = (1..=3_000)
        .map(|i| format!("第{}章 标题\n{}\n", i, "内容".repeat(100)))
        .collect();
    let outline = extract_outline(&text);

    assert_eq!(outline.chapter_count(), 3_000);
    assert_eq!(outline.find_chapter(2_999).unwrap().title, "标题");
    assert_outline_invariants(&text, &outline);
    assert_reading_sequence_tiles(&outline);
}

#[test]
fn test_volumes_without_chapters_get_window_chapters() {
    let body = "内容".repeat(8_000);
    let text = format!("第一卷 风起\n{}\n第二卷 云涌\n{}", body, body);
    let outline = extract_outline(&text);
    assert_outline_invariants(&text, &outline);
    assert_eq!(outline.total_length, 32_015);

    let volumes: Vec<(&str, usize, usize, bool)> = outline
        .volumes()
        .map(|v| (v.title.as_str(), v.start_position, v.end_position, v.synthetic))
        .collect();
    assert_eq!(
        volumes,
        vec![("风起", 0, 16_008, false), ("云涌", 16_008, 32_015, false)]
    );

    let chapters: Vec<(u32, usize, usize)> = outline
        .chapters()
        .map(|c| (c.sequence_id, c.start_position, c.end_position))
        .collect();
    assert_eq!(
        chapters,
        vec![
            (1, 0, 10_000),
            (2, 10_000, 16_008),
            (3, 16_008, 26_008),
            (4, 26_008, 32_015),
        ]
    );

    let second = outline.nodes.iter().position(|n| n.title == "云涌").unwrap();
    assert_eq!(outline.chapters_of(second).count(), 2);
    assert!(outline.chapters().all(|c| c.synthetic && c.parent_id.is_some()));
    assert_eq!(outline.find_chapter(3).unwrap().start_line, 2);
}

#[test]
fn test_volumes_only_with_preamble() {
    let text = "作者：佚名\n第一卷 风起\n内容";
    let outline = extract_outline(text);
    assert_outline_invariants(text, &outline);

    let titles: Vec<&str> = outline.nodes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["正文", "第1章", "风起", "第2章"]);
    assert!(outline.nodes[0].synthetic);
    assert_eq!(outline.nodes[0].end_position, 6);
    assert_eq!(outline.chapter_at(8).map(|c| c.sequence_id), Some(2));
}
