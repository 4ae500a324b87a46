use super::types::LineRecord;

/// 行切分器
///
/// 把原文切分为 `LineRecord` 序列，支持 `\n`、`\r\n` 和单独的 `\r` 三种换行符。
/// 所有偏移都是字符偏移，拼接 `raw_text + 换行符` 可以精确还原原文。
pub struct LineSegmenter {
    min_title_chars: usize,
    max_title_chars: usize,
}

impl LineSegmenter {
    pub fn new(min_title_chars: usize, max_title_chars: usize) -> Self {
        Self {
            min_title_chars,
            max_title_chars,
        }
    }

    /// 切分所有行
    ///
    /// 空字符串返回空列表；以换行符结尾的文本不会产生末尾空行。
    pub fn segment<'a>(&self, text: &'a str) -> Vec<LineRecord<'a>> {
        let mut records = Vec::new();
        let mut line_start_byte = 0;
        let mut line_start_char = 0;
        let mut char_pos = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((byte_idx, ch)) = chars.next() {
            let break_len = match ch {
                '\n' => 1,
                '\r' => {
                    if matches!(chars.peek(), Some((_, '\n'))) {
                        chars.next();
                        2
                    } else {
                        1
                    }
                }
                _ => {
                    char_pos += 1;
                    continue;
                }
            };

            records.push(make_record(
                &text[line_start_byte..byte_idx],
                line_start_char,
                break_len,
                records.len(),
            ));

            // 换行符都是单字节字符
            line_start_byte = byte_idx + break_len;
            char_pos += break_len;
            line_start_char = char_pos;
        }

        if line_start_byte < text.len() {
            records.push(make_record(
                &text[line_start_byte..],
                line_start_char,
                0,
                records.len(),
            ));
        }

        records
    }

    /// 是否可能是标题行（去空白后的长度在区间内）
    pub fn is_candidate(&self, record: &LineRecord<'_>) -> bool {
        let len = record.trimmed_char_len();
        len >= self.min_title_chars && len <= self.max_title_chars
    }

    /// 只保留可能是标题的行，偏移保持原文中的真实位置
    pub fn candidates<'a>(&self, text: &'a str) -> Vec<LineRecord<'a>> {
        self.segment(text)
            .into_iter()
            .filter(|record| self.is_candidate(record))
            .collect()
    }
}

fn make_record(raw: &str, start_offset: usize, line_break_length: usize, line_index: usize) -> LineRecord<'_> {
    LineRecord {
        raw_text: raw,
        trimmed_text: trim_line(raw),
        start_offset,
        line_break_length,
        line_index,
    }
}

/// 去除首尾空白（含全角空格）以及残留的 BOM
pub fn trim_line(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}
