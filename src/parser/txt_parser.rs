use super::*;
use encoding_rs::{Encoding, BIG5, GBK, UTF_8};

use crate::outline::OutlineExtractor;

/// 解码后的文本
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// TXT 解析器
///
/// 支持纯文本文件的解析，自动检测编码（UTF-8, GBK, Big5 等）
#[derive(Clone)]
pub struct TxtParser;

impl TxtParser {
    /// 创建新的 TXT 解析器实例
    pub fn new() -> Self {
        Self
    }

    /// 检测文件编码
    ///
    /// 尝试检测文件的字符编码，支持 UTF-8、GBK 等常见编码
    ///
    /// # 参数
    /// - `bytes`: 文件字节数据
    ///
    /// # 返回
    /// 检测到的编码
    fn detect_encoding(&self, bytes: &[u8]) -> &'static Encoding {
        // 1. 检查 BOM (Byte Order Mark)
        if let Some((encoding, _bom_length)) = Encoding::for_bom(bytes) {
            return encoding;
        }

        // 2. 尝试 UTF-8 解码
        if std::str::from_utf8(bytes).is_ok() {
            return UTF_8;
        }

        // 3. 检测是否为 GBK
        if self.looks_like_gbk(bytes) {
            return GBK;
        }

        // 4. 默认使用 UTF-8
        UTF_8
    }

    /// 检测字节序列是否像 GBK 编码
    ///
    /// GBK 编码特征：
    /// - 第一字节范围：0x81-0xFE
    /// - 第二字节范围：0x40-0xFE
    fn looks_like_gbk(&self, bytes: &[u8]) -> bool {
        let mut gbk_pairs = 0;
        let mut total_pairs = 0;

        let mut i = 0;
        while i < bytes.len().saturating_sub(1) {
            let b1 = bytes[i];
            let b2 = bytes[i + 1];

            // 检查是否为 ASCII 字符
            if b1 < 0x80 {
                i += 1;
                continue;
            }

            total_pairs += 1;

            // 检查是否符合 GBK 编码规则
            if (0x81..=0xFE).contains(&b1) && (0x40..=0xFE).contains(&b2) {
                gbk_pairs += 1;
                i += 2; // 跳过这一对字节
            } else {
                i += 1;
            }
        }

        // 如果超过 50% 的非 ASCII 字节对符合 GBK 规则，则认为是 GBK
        total_pairs > 0 && (gbk_pairs as f32 / total_pairs as f32) > 0.5
    }

    /// 按给定编码无损解码，出现无法解码的字节时返回 `None`
    fn decode_strict(&self, bytes: &[u8], encoding: &'static Encoding) -> Option<DecodedText> {
        let (text, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            return None;
        }
        Some(DecodedText {
            text: text.into_owned(),
            encoding: used,
        })
    }

    /// 解码文件内容
    ///
    /// - 指定了编码标签时只用该编码，遇到错误直接失败
    /// - 否则先用检测结果，再依次尝试 GBK、Big5，都失败时报错
    ///
    /// 解码失败必须在目录提取之前中止。
    pub fn decode(&self, bytes: &[u8], label: Option<&str>) -> ReaderResult<DecodedText> {
        if let Some(label) = label {
            let encoding = Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| ReaderError::Decode(format!("未知编码: {}", label)))?;
            return self
                .decode_strict(bytes, encoding)
                .ok_or_else(|| ReaderError::Decode(format!("内容不是有效的 {} 编码", encoding.name())));
        }

        let detected = self.detect_encoding(bytes);
        if let Some(decoded) = self.decode_strict(bytes, detected) {
            return Ok(decoded);
        }

        // 依次尝试备选编码
        for encoding in [GBK, BIG5].into_iter().filter(|e| *e != detected) {
            if let Some(decoded) = self.decode_strict(bytes, encoding) {
                tracing::debug!(
                    detected = detected.name(),
                    used = encoding.name(),
                    "检测编码解码失败，使用备选编码"
                );
                return Ok(decoded);
            }
        }

        Err(ReaderError::Decode("无法识别文件编码，可能存在乱码".to_string()))
    }
}

impl Parser for TxtParser {
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ReaderResult<ParseResult> {
        // 1. 解码为字符串
        let decoded = self.decode(bytes, options.encoding.as_deref())?;

        // 2. 提取章节目录
        let extractor = OutlineExtractor::with_config(options.extractor.clone());
        let outline = extractor.extract(&decoded.text);

        tracing::info!(
            encoding = decoded.encoding.name(),
            total_length = outline.total_length,
            volumes = outline.volume_count(),
            chapters = outline.chapter_count(),
            "TXT 解析完成"
        );

        Ok(ParseResult {
            text: decoded.text,
            encoding: decoded.encoding.name(),
            outline,
        })
    }

    fn format(&self) -> BookFormat {
        BookFormat::Txt
    }

    fn supported_extensions(&self) -> Vec<&str> {
        vec!["txt"]
    }
}

impl Default for TxtParser {
    fn default() -> Self {
        Self::new()
    }
}
