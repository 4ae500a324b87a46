use std::collections::HashMap;
use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::config::ExtractorConfig;
use crate::error::{ReaderError, ReaderResult};
use crate::outline::OutlineResult;

// 子模块声明
pub mod txt_parser;
pub mod unsupported_parser;

/// 书籍格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookFormat {
    Txt,
    Epub,
    Pdf,
}

impl BookFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Txt => "TXT",
            BookFormat::Epub => "EPUB",
            BookFormat::Pdf => "PDF",
        }
    }

    /// 按名称或扩展名解析（不区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "txt" => Some(BookFormat::Txt),
            "epub" => Some(BookFormat::Epub),
            "pdf" => Some(BookFormat::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析选项
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// 调用方指定的编码标签（如 "gbk"），为空时自动检测
    pub encoding: Option<String>,
    /// 目录提取配置
    pub extractor: ExtractorConfig,
}

/// 解析结果
///
/// 包含解码后的全文、使用的编码和章节目录
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// 解码后的全文
    pub text: String,
    /// 实际使用的编码名称
    pub encoding: &'static str,
    /// 章节/分卷目录
    pub outline: OutlineResult,
}

/// Parser trait
///
/// 所有格式解析器必须实现此 trait
pub trait Parser: Send + Sync {
    /// 解析文件内容
    ///
    /// # 参数
    /// - `bytes`: 文件原始字节
    /// - `options`: 编码与目录提取配置
    ///
    /// # 返回
    /// 解析结果，包含全文、编码和目录
    fn parse(&self, bytes: &[u8], options: &ParseOptions) -> ReaderResult<ParseResult>;

    /// 对应的书籍格式
    fn format(&self) -> BookFormat;

    /// 获取支持的文件扩展名列表
    fn supported_extensions(&self) -> Vec<&str>;
}

/// Parser 路由器
///
/// 根据文件扩展名或声明的格式路由到对应的解析器
pub struct ParserRouter {
    /// 扩展名到解析器的映射
    parsers: HashMap<String, Box<dyn Parser>>,
}

impl ParserRouter {
    /// 创建新的路由器实例
    ///
    /// 注册所有已知格式；EPUB 与 PDF 目前只返回"暂不支持"
    pub fn new() -> Self {
        let mut parsers: HashMap<String, Box<dyn Parser>> = HashMap::new();

        // 注册 TXT 解析器
        let txt = Box::new(txt_parser::TxtParser::new());
        for ext in txt.supported_extensions() {
            parsers.insert(ext.to_string(), txt.clone());
        }

        // 注册 EPUB、PDF 占位解析器
        for format in [BookFormat::Epub, BookFormat::Pdf] {
            let stub = Box::new(unsupported_parser::UnsupportedParser::new(format));
            for ext in stub.supported_extensions() {
                parsers.insert(ext.to_string(), stub.clone());
            }
        }

        Self { parsers }
    }

    /// 根据文件路径路由到对应的解析器
    ///
    /// # 参数
    /// - `file_path`: 文件路径
    ///
    /// # 返回
    /// 对应的解析器引用，如果不支持该格式则返回错误
    pub fn route(&self, file_path: &Path) -> ReaderResult<&dyn Parser> {
        let ext = file_path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or(ReaderError::MissingExtension)?
            .to_lowercase();

        self.route_extension(&ext)
    }

    /// 根据声明的格式路由（如上传时携带的 fileType）
    pub fn route_format(&self, format: BookFormat) -> ReaderResult<&dyn Parser> {
        self.route_extension(&format.as_str().to_lowercase())
    }

    fn route_extension(&self, ext: &str) -> ReaderResult<&dyn Parser> {
        self.parsers
            .get(ext)
            .map(|p| p.as_ref())
            .ok_or_else(|| ReaderError::UnknownFormat(ext.to_string()))
    }

    /// 获取所有支持的文件扩展名
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.parsers.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// 检查是否支持指定的文件扩展名
    pub fn supports(&self, extension: &str) -> bool {
        self.parsers.contains_key(&extension.to_lowercase())
    }
}

impl Default for ParserRouter {
    fn default() -> Self {
        Self::new()
    }
}
