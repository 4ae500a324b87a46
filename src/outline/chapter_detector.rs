use regex::Regex;

use super::types::NodeKind;

/// 中文数字与阿拉伯数字字符集（用于正则字符类）
const NUMERAL_CLASS: &str = "零一二三四五六七八九十百千万壹贰叁肆伍陆柒捌玖拾佰仟0-9０-９";
/// 阿拉伯数字（半角与全角）
const DIGIT_CLASS: &str = "0-9０-９";

/// 可能出现在标题首字符位置的关键字
const LEADING_KEYWORD_CHARS: &str = "第卷序楔前引后终尾附";
/// 可能出现在标题首字符位置的中文数字
const LEADING_NUMERAL_CHARS: &str = "零一二三四五六七八九十百千万壹贰叁肆伍陆柒捌玖拾佰仟";
/// 英文标题前缀（小写）
const ENGLISH_KEYWORDS: [&str; 7] = ["chapter", "section", "ep", "volume", "vol", "book", "part"];

/// 标题匹配模式
///
/// 不同模式的捕获组位置不同，因此每个模式显式记录序号组、副标题组和名称组。
pub struct TitlePattern {
    /// 模式名称（调试用）
    pub name: &'static str,
    pub kind: NodeKind,
    regex: Regex,
    /// 序号所在捕获组
    numeral_group: Option<usize>,
    /// 副标题所在捕获组
    subtitle_group: Option<usize>,
    /// 特殊章节名（序章、后记等）所在捕获组
    label_group: Option<usize>,
}

impl TitlePattern {
    fn new(
        name: &'static str,
        kind: NodeKind,
        pattern: &str,
        numeral_group: Option<usize>,
        subtitle_group: Option<usize>,
        label_group: Option<usize>,
    ) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("内置标题模式 {} 无效: {}", name, e));
        Self {
            name,
            kind,
            regex,
            numeral_group,
            subtitle_group,
            label_group,
        }
    }

    /// 尝试匹配一行（已去除首尾空白）
    pub fn match_line<'t>(&self, line: &'t str) -> Option<TitleMatch<'t>> {
        let caps = self.regex.captures(line)?;
        let group = |index: Option<usize>| {
            index
                .and_then(|i| caps.get(i))
                .map(|m| m.as_str())
        };
        Some(TitleMatch {
            kind: self.kind,
            pattern: self.name,
            numeral: group(self.numeral_group),
            subtitle: group(self.subtitle_group),
            label: group(self.label_group),
        })
    }
}

/// 一次标题匹配的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch<'t> {
    pub kind: NodeKind,
    /// 命中的模式名称
    pub pattern: &'static str,
    pub numeral: Option<&'t str>,
    pub subtitle: Option<&'t str>,
    pub label: Option<&'t str>,
}

impl TitleMatch<'_> {
    /// 清理后的副标题；为空时返回 `None`
    pub fn clean_subtitle(&self) -> Option<String> {
        let cleaned = self
            .subtitle?
            .trim()
            .trim_start_matches(|c: char| {
                c.is_whitespace() || matches!(c, ':' | '：' | '、' | '.' | '．' | '·' | '-' | '—')
            })
            .trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }
}

/// 分卷模式，按优先级排列
fn volume_patterns() -> Vec<TitlePattern> {
    vec![
        // 第一卷 / 第二部 / 第三篇 / 第四集 / 第五册
        TitlePattern::new(
            "volume_cn",
            NodeKind::Volume,
            &format!(r"^第([{}]{{1,8}})[卷部篇集册](.*)$", NUMERAL_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // 第一分卷
        TitlePattern::new(
            "volume_cn_split",
            NodeKind::Volume,
            &format!(r"^第([{}]{{1,8}})分卷(.*)$", NUMERAL_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // Volume 1 / Book 2: Title / Part 3. Title
        TitlePattern::new(
            "volume_en",
            NodeKind::Volume,
            &format!(r"^(?i-u:volume|vol\.?|book|part)\s*([{}]{{1,4}})\s*[:：.]?(.*)$", DIGIT_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // Part II / Part II: Title（罗马数字无法换算，使用顺序计数）
        // 罗马数字后必须是行尾或显式分隔符，"Part I think" 之类的句子不算
        TitlePattern::new(
            "volume_en_roman",
            NodeKind::Volume,
            r"^(?i-u:volume|book|part)\s+([IVXLC]{1,7})(?:\s*[:：.]\s*(.*))?$",
            Some(1),
            Some(2),
            None,
        ),
        // 卷一 风起
        TitlePattern::new(
            "volume_cn_prefix",
            NodeKind::Volume,
            &format!(r"^卷\s*([{}]{{1,8}})(?:[\s:：、.]+(.*))?$", NUMERAL_CLASS),
            Some(1),
            Some(2),
            None,
        ),
    ]
}

/// 章节模式，按优先级排列，顺序决定歧义行的归属
fn chapter_patterns() -> Vec<TitlePattern> {
    vec![
        // 1. 标题 / 1、标题
        TitlePattern::new(
            "chapter_numbered_dot",
            NodeKind::Chapter,
            &format!(r"^([{}]{{1,4}})[.、．]\s*(.*)$", DIGIT_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // 第一章 / 第1回 / 第十节 / 第二篇 / 第三幕
        TitlePattern::new(
            "chapter_cn",
            NodeKind::Chapter,
            &format!(r"^第([{}]{{1,8}})[章回节篇幕](.*)$", NUMERAL_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // 1 标题
        TitlePattern::new(
            "chapter_numbered_space",
            NodeKind::Chapter,
            &format!(r"^([{}]{{1,4}})\s+(.*)$", DIGIT_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // 一章 标题（省略"第"）
        TitlePattern::new(
            "chapter_cn_bare",
            NodeKind::Chapter,
            &format!(r"^([{}]{{1,4}})[章回节篇幕](.*)$", NUMERAL_CLASS),
            Some(1),
            Some(2),
            None,
        ),
        // 序章、后记等特殊章节
        TitlePattern::new(
            "chapter_special",
            NodeKind::Chapter,
            r"^(序章|序幕|序言|楔子|前言|引言|后记|终章|尾声|附录)(.*)$",
            None,
            Some(2),
            Some(1),
        ),
        // Chapter 1: Title / Section 2 / Ep 3（序号在第二个捕获组）
        TitlePattern::new(
            "chapter_en",
            NodeKind::Chapter,
            &format!(r"^(?i-u:(chapter|section|episode|ep))\s*([{}]{{1,4}})\s*[:：.]?(.*)$", DIGIT_CLASS),
            Some(2),
            Some(3),
            None,
        ),
    ]
}

/// 章节标题检测器
///
/// 持有两张按优先级排序的模式表：
/// 1. 先匹配分卷模式，命中则不再尝试章节模式
/// 2. 再按顺序匹配章节模式，第一个命中的模式生效
pub struct ChapterDetector {
    volume_patterns: Vec<TitlePattern>,
    chapter_patterns: Vec<TitlePattern>,
}

impl ChapterDetector {
    /// 创建检测器，编译全部内置模式
    pub fn new() -> Self {
        Self {
            volume_patterns: volume_patterns(),
            chapter_patterns: chapter_patterns(),
        }
    }

    /// 进程内共享的检测器
    ///
    /// 模式表只读，编译一次即可在多线程间共享。
    pub fn shared() -> &'static ChapterDetector {
        static DETECTOR: std::sync::OnceLock<ChapterDetector> = std::sync::OnceLock::new();
        DETECTOR.get_or_init(ChapterDetector::new)
    }

    /// 快速预筛：首字符不可能构成标题时直接跳过完整匹配
    ///
    /// 只是性能优化，预筛放行的集合覆盖所有模式可能的首字符。
    /// 英文关键字在模式中只做 ASCII 大小写折叠，这里同样只认 ASCII 字母。
    pub fn is_potential_title(line: &str) -> bool {
        let Some(first) = line.chars().next() else {
            return false;
        };
        if first.is_ascii_digit()
            || ('０'..='９').contains(&first)
            || LEADING_KEYWORD_CHARS.contains(first)
            || LEADING_NUMERAL_CHARS.contains(first)
        {
            return true;
        }
        if first.is_ascii_alphabetic() {
            let prefix: String = line.chars().take(7).collect::<String>().to_ascii_lowercase();
            return ENGLISH_KEYWORDS.iter().any(|k| prefix.starts_with(k));
        }
        false
    }

    /// 对一行（已去除首尾空白）做完整分类，不经过预筛
    pub fn classify<'t>(&self, line: &'t str) -> Option<TitleMatch<'t>> {
        self.volume_patterns
            .iter()
            .chain(self.chapter_patterns.iter())
            .find_map(|pattern| pattern.match_line(line))
    }

    /// 显式标题识别：预筛 + 分类
    pub fn detect_explicit<'t>(&self, line: &'t str) -> Option<TitleMatch<'t>> {
        if !Self::is_potential_title(line) {
            return None;
        }
        self.classify(line)
    }

    pub fn volume_pattern_names(&self) -> Vec<&'static str> {
        self.volume_patterns.iter().map(|p| p.name).collect()
    }

    pub fn chapter_pattern_names(&self) -> Vec<&'static str> {
        self.chapter_patterns.iter().map(|p| p.name).collect()
    }
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(line: &str) -> Option<TitleMatch<'_>> {
        ChapterDetector::shared().detect_explicit(line)
    }

    #[test]
    fn test_explicit_detection_chinese() {
        let m = detect("第一章 开始").unwrap();
        assert_eq!(m.kind, NodeKind::Chapter);
        assert_eq!(m.pattern, "chapter_cn");
        assert_eq!(m.numeral, Some("一"));
        assert_eq!(m.clean_subtitle().as_deref(), Some("开始"));

        assert!(detect("第1章 开始").is_some());
        assert!(detect("第十回 结束").is_some());
        assert!(detect("第一节 介绍").is_some());
        assert!(detect("第三幕").is_some());
    }

    #[test]
    fn test_explicit_detection_volumes() {
        for line in ["第一卷 风起", "第二部 云涌", "第3集", "第四册 终", "第一分卷 序", "卷一 风起", "Volume 2", "Book 3: Fire", "Part II: The Return"] {
            let m = detect(line).unwrap_or_else(|| panic!("未识别: {}", line));
            assert_eq!(m.kind, NodeKind::Volume, "{}", line);
        }
        assert_eq!(detect("第一分卷 序").unwrap().pattern, "volume_cn_split");
        assert_eq!(detect("Part II: The Return").unwrap().numeral, Some("II"));
    }

    #[test]
    fn test_volume_precedence() {
        // "第二篇" 同时符合分卷模式与章节模式，分卷优先
        let m = detect("第二篇 山河").unwrap();
        assert_eq!(m.kind, NodeKind::Volume);
        assert_eq!(m.pattern, "volume_cn");
    }

    #[test]
    fn test_explicit_detection_english() {
        let m = detect("Chapter 12: The End").unwrap();
        assert_eq!(m.kind, NodeKind::Chapter);
        assert_eq!(m.numeral, Some("12"));
        assert_eq!(m.clean_subtitle().as_deref(), Some("The End"));

        assert!(detect("CHAPTER 1").is_some());
        assert!(detect("section 3").is_some());
        assert!(detect("Ep 7：重逢").is_some());
        assert!(detect("Episode 8").is_some());
    }

    #[test]
    fn test_explicit_detection_numbers() {
        let m = detect("1. 出发").unwrap();
        assert_eq!(m.pattern, "chapter_numbered_dot");
        assert_eq!(m.numeral, Some("1"));

        assert_eq!(detect("2、归来").unwrap().pattern, "chapter_numbered_dot");
        assert_eq!(detect("３ 重逢").unwrap().pattern, "chapter_numbered_space");
        assert_eq!(detect("十二章 雨夜").unwrap().pattern, "chapter_cn_bare");
    }

    #[test]
    fn test_special_chapters() {
        let m = detect("序章").unwrap();
        assert_eq!(m.kind, NodeKind::Chapter);
        assert_eq!(m.numeral, None);
        assert_eq!(m.label, Some("序章"));
        assert_eq!(m.clean_subtitle(), None);

        let m = detect("后记：写在最后").unwrap();
        assert_eq!(m.clean_subtitle().as_deref(), Some("写在最后"));
        assert!(detect("楔子").is_some());
    }

    #[test]
    fn test_explicit_detection_negative() {
        assert!(detect("普通段落文本").is_none());
        assert!(detect("他说：第一次见面").is_none());
        assert!(detect("Partial results").is_none());
        assert!(detect("Bookcase").is_none());
        assert!(detect("ſection 1").is_none());
        assert!(ChapterDetector::shared().classify("ſection 1").is_none());
        assert!(detect("").is_none());
    }

    #[test]
    fn test_prefilter_does_not_change_classification() {
        let samples = [
            "第一章 开始", "一章", "卷三", "序章", "楔子 往事", "Chapter 1", "volume 4",
            "Part IV", "1. 标题", "１ 标题", "千回百转", "普通段落", "“第一章”", "——第二章",
            "Episode 9", "book", "其他内容", "三天后", "Prologue", "ſection 1", "ſection 1: 标题",
            "\u{212A}", "Ⓒhapter 2",
        ];
        let detector = ChapterDetector::shared();
        for line in samples {
            assert_eq!(detector.detect_explicit(line), detector.classify(line), "{}", line);
        }
    }

    #[test]
    fn test_roman_volume_needs_separator_or_line_end() {
        assert_eq!(detect("Part IV").unwrap().kind, NodeKind::Volume);
        assert_eq!(detect("Book III.").unwrap().numeral, Some("III"));
        let m = detect("Volume II：归来").unwrap();
        assert_eq!(m.clean_subtitle().as_deref(), Some("归来"));

        assert!(detect("Part I think so").is_none());
        assert!(detect("Book I love").is_none());
        assert!(detect("Part IV of the story").is_none());
    }

    #[test]
    fn test_pattern_order_is_stable() {
        let detector = ChapterDetector::shared();
        assert_eq!(
            detector.chapter_pattern_names(),
            vec![
                "chapter_numbered_dot",
                "chapter_cn",
                "chapter_numbered_space",
                "chapter_cn_bare",
                "chapter_special",
                "chapter_en",
            ]
        );
        assert_eq!(detector.volume_pattern_names()[0], "volume_cn");
    }

    #[test]
    fn test_clean_subtitle_strips_separators() {
        let m = detect("第五章：　重逢").unwrap();
        assert_eq!(m.clean_subtitle().as_deref(), Some("重逢"));
        let m = detect("第六章   ").unwrap();
        assert_eq!(m.clean_subtitle(), None);
    }
}
