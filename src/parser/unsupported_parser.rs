use super::*;

/// 尚未支持的格式（EPUB、PDF）
///
/// 路由器可以识别这些扩展名，但解析时明确返回"暂不支持"，不做任何猜测性的文本提取。
#[derive(Clone)]
pub struct UnsupportedParser {
    format: BookFormat,
}

impl UnsupportedParser {
    pub fn new(format: BookFormat) -> Self {
        Self { format }
    }
}

impl Parser for UnsupportedParser {
    fn parse(&self, _bytes: &[u8], _options: &ParseOptions) -> ReaderResult<ParseResult> {
        tracing::warn!(format = self.format.as_str(), "暂不支持的文件类型");
        Err(ReaderError::UnsupportedFormat(self.format.to_string()))
    }

    fn format(&self) -> BookFormat {
        self.format
    }

    fn supported_extensions(&self) -> Vec<&str> {
        match self.format {
            BookFormat::Epub => vec!["epub"],
            BookFormat::Pdf => vec!["pdf"],
            BookFormat::Txt => vec![],
        }
    }
}
