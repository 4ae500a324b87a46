use std::collections::HashMap;

/// 单个字符的数值映射（含大写数字）
fn char_value(c: char) -> Option<u32> {
    let value = match c {
        '零' => 0,
        '一' | '壹' => 1,
        '二' | '贰' => 2,
        '三' | '叁' => 3,
        '四' | '肆' => 4,
        '五' | '伍' => 5,
        '六' | '陆' => 6,
        '七' | '柒' => 7,
        '八' | '捌' => 8,
        '九' | '玖' => 9,
        '十' | '拾' => 10,
        '百' | '佰' => 100,
        '千' | '仟' => 1000,
        _ => return None,
    };
    Some(value)
}

/// 一到九（含大写）
fn digit_value(c: char) -> Option<u32> {
    char_value(c).filter(|v| (1..=9).contains(v))
}

/// 零到九（含大写）
fn digit_or_zero_value(c: char) -> Option<u32> {
    char_value(c).filter(|v| *v <= 9)
}

/// 全角数字转半角
fn normalize_digits(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// 把数字串（阿拉伯数字或中文数字）转换为整数
///
/// 只支持以下形式，其余一律返回 `None`，由调用方改用顺序计数：
/// - 十进制整数（半角或全角）
/// - 十、十一 … 十九
/// - 一百、一百二（120）、三百零 等 "X百Y" 形式
/// - 单个字符：零 … 九、十、百、千及其大写
pub fn chinese_to_number(token: &str) -> Option<u32> {
    let normalized = normalize_digits(token.trim());
    if normalized.is_empty() {
        return None;
    }
    if normalized.bytes().all(|b| b.is_ascii_digit()) {
        return normalized.parse::<u32>().ok();
    }

    let chars: Vec<char> = normalized.chars().collect();
    match chars.as_slice() {
        [single] => char_value(*single),
        [ten, unit] if char_value(*ten) == Some(10) => digit_value(*unit).map(|d| 10 + d),
        [hundreds, hundred] if char_value(*hundred) == Some(100) => {
            digit_value(*hundreds).map(|d| d * 100)
        }
        // "一百二" 是 "一百二十" 的省略说法
        [hundreds, hundred, tens] if char_value(*hundred) == Some(100) => {
            let d = digit_value(*hundreds)?;
            let t = digit_or_zero_value(*tens)?;
            Some(d * 100 + t * 10)
        }
        _ => None,
    }
}

/// 带缓存的数字转换器
///
/// 一本书中同一个数字串会反复出现，缓存以字面串为键，只在一次解析内有效。
#[derive(Debug, Default)]
pub struct NumeralConverter {
    cache: HashMap<String, Option<u32>>,
}

impl NumeralConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert(&mut self, token: &str) -> Option<u32> {
        if let Some(cached) = self.cache.get(token) {
            return *cached;
        }
        let value = chinese_to_number(token);
        self.cache.insert(token.to_string(), value);
        value
    }

    /// 已缓存的不同数字串数量
    pub fn cached_tokens(&self) -> usize {
        self.cache.len()
    }
}
