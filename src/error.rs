use thiserror::Error;

/// 阅读器错误类型
///
/// 目录解析本身不会失败；这里的错误只来自解码、格式路由、配置和持久化。
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("不支持的文件格式: {0}")]
    UnknownFormat(String),
    #[error("暂不支持的文件类型: {0}")]
    UnsupportedFormat(String),
    #[error("无法识别文件扩展名")]
    MissingExtension,
    #[error("文件解码失败: {0}")]
    Decode(String),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("书籍不存在: {0}")]
    BookNotFound(i64),
    #[error("章节不存在: 书籍 {book_id} 的第 {index} 个节点")]
    NodeNotFound { book_id: i64, index: usize },
    #[error("无效的范围: [{start}, {end})")]
    InvalidRange { start: usize, end: usize },
    #[error("无效的位置: {position}（全文共 {total_length} 字）")]
    InvalidPosition { position: usize, total_length: usize },
    #[error("笔记不存在: {0}")]
    NoteNotFound(i64),
    #[error("无效的笔记: {0}")]
    InvalidNote(String),
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ReaderResult<T> = Result<T, ReaderError>;
