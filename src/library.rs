use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::config::ExtractorConfig;
use crate::db::{self, BookRecord, NewBook, Note, NoteDraft, NoteUpdate, ReadingRecord};
use crate::error::{ReaderError, ReaderResult};
use crate::outline::{OutlineExtractor, OutlineNode, OutlineResult};
use crate::parser::{BookFormat, ParseOptions, ParserRouter};

/// 导入结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub book_id: i64,
    /// 内容已存在时为 true，此时不会重复写入
    pub duplicate: bool,
    pub outline: OutlineResult,
}

/// 按字符区间读取的正文片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSlice {
    pub content: String,
    pub start: usize,
    pub end: usize,
    pub total_length: usize,
    pub has_more: bool,
}

/// 阅读进度
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub book_id: i64,
    pub position: usize,
    pub total_length: usize,
    /// 已读百分比（0-100）
    pub percent: f64,
    /// 当前位置所在章节在目录中的下标
    pub chapter_index: Option<usize>,
    pub chapter: Option<OutlineNode>,
}

/// 书库：解析、存储并检索书籍与目录
pub struct Library {
    conn: Connection,
    router: ParserRouter,
    config: ExtractorConfig,
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Library {
    pub fn open<P: AsRef<Path>>(path: P, config: ExtractorConfig) -> ReaderResult<Self> {
        config.validate()?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = db::init_db(path)?;
        Ok(Self::with_connection(conn, config))
    }

    pub fn open_in_memory(config: ExtractorConfig) -> ReaderResult<Self> {
        config.validate()?;
        let conn = db::init_memory_db()?;
        Ok(Self::with_connection(conn, config))
    }

    fn with_connection(conn: Connection, config: ExtractorConfig) -> Self {
        Self {
            conn,
            router: ParserRouter::new(),
            config,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// 导入本地文件，书名取文件名（不含扩展名）
    pub fn import_file(&mut self, path: &Path, encoding: Option<&str>) -> ReaderResult<ImportOutcome> {
        let format = self.router.route(path)?.format();
        let bytes = fs::read(path)?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "未命名".to_string());
        let file_path = path.to_string_lossy();

        self.import_bytes(&title, format, &bytes, encoding, Some(&file_path))
    }

    /// 导入内存中的文件内容
    pub fn import_bytes(
        &mut self,
        title: &str,
        format: BookFormat,
        bytes: &[u8],
        encoding: Option<&str>,
        file_path: Option<&str>,
    ) -> ReaderResult<ImportOutcome> {
        let options = ParseOptions {
            encoding: encoding.map(str::to_string),
            extractor: self.config.clone(),
        };
        let parsed = self.router.route_format(format)?.parse(bytes, &options)?;
        let hash = content_hash(&parsed.text);

        if let Some(book_id) = db::find_book_by_hash(&self.conn, &hash)? {
            tracing::info!(book_id, title, "内容已存在，跳过导入");
            let outline = self.outline(book_id)?;
            return Ok(ImportOutcome {
                book_id,
                duplicate: true,
                outline,
            });
        }

        let book_id = db::insert_book_with_outline(
            &mut self.conn,
            &NewBook {
                title,
                format,
                encoding: parsed.encoding,
                file_path,
                content: &parsed.text,
                content_hash: &hash,
                total_length: parsed.outline.total_length,
            },
            &parsed.outline,
        )?;

        tracing::info!(
            book_id,
            title,
            volumes = parsed.outline.volume_count(),
            chapters = parsed.outline.chapter_count(),
            "书籍导入完成"
        );

        Ok(ImportOutcome {
            book_id,
            duplicate: false,
            outline: parsed.outline,
        })
    }

    pub fn list_books(&self) -> ReaderResult<Vec<BookRecord>> {
        Ok(db::list_books(&self.conn)?)
    }

    pub fn book(&self, book_id: i64) -> ReaderResult<BookRecord> {
        db::get_book(&self.conn, book_id)?.ok_or(ReaderError::BookNotFound(book_id))
    }

    pub fn outline(&self, book_id: i64) -> ReaderResult<OutlineResult> {
        db::load_outline(&self.conn, book_id)?.ok_or(ReaderError::BookNotFound(book_id))
    }

    /// 读取目录节点（分卷或章节）对应的正文
    pub fn chapter_text(&self, book_id: i64, node_index: usize) -> ReaderResult<String> {
        let outline = self.outline(book_id)?;
        let node = outline
            .nodes
            .get(node_index)
            .ok_or(ReaderError::NodeNotFound { book_id, index: node_index })?;
        Ok(self.read_range(book_id, node.start_position, node.end_position)?.content)
    }

    /// 按字符区间读取正文，`end` 超出全文长度时截断
    pub fn read_range(&self, book_id: i64, start: usize, end: usize) -> ReaderResult<ContentSlice> {
        if start > end {
            return Err(ReaderError::InvalidRange { start, end });
        }
        let total_length = self.book(book_id)?.total_length;
        let start = start.min(total_length);
        let end = end.min(total_length);

        let content = db::read_content_range(&self.conn, book_id, start, end)?
            .ok_or(ReaderError::BookNotFound(book_id))?;

        Ok(ContentSlice {
            content,
            start,
            end,
            total_length,
            has_more: end < total_length,
        })
    }

    /// 用当前配置重新提取目录并覆盖已保存的目录
    pub fn reparse(&mut self, book_id: i64) -> ReaderResult<OutlineResult> {
        let content = db::get_book_content(&self.conn, book_id)?
            .ok_or(ReaderError::BookNotFound(book_id))?;
        let outline = OutlineExtractor::with_config(self.config.clone()).extract(&content);
        db::save_outline(&mut self.conn, book_id, &outline)?;

        tracing::info!(
            book_id,
            volumes = outline.volume_count(),
            chapters = outline.chapter_count(),
            "目录已重新解析"
        );
        Ok(outline)
    }

    /// 记录阅读位置，同时追加一条阅读记录
    pub fn update_read_pos(&mut self, book_id: i64, position: usize) -> ReaderResult<ReadingProgress> {
        let total_length = self.book(book_id)?.total_length;
        if position > total_length {
            return Err(ReaderError::InvalidPosition { position, total_length });
        }
        if !db::update_read_pos(&mut self.conn, book_id, position)? {
            return Err(ReaderError::BookNotFound(book_id));
        }
        tracing::debug!(book_id, position, "阅读进度已更新");
        self.read_pos(book_id)
    }

    /// 当前阅读进度，以及该位置所在的章节
    pub fn read_pos(&self, book_id: i64) -> ReaderResult<ReadingProgress> {
        let book = self.book(book_id)?;
        let outline = self.outline(book_id)?;
        let position = book.last_read_pos.min(book.total_length);

        // 读到末尾时算作最后一章
        let chapter_index = outline
            .chapter_at(position)
            .or_else(|| (position == book.total_length).then(|| outline.chapters().last()).flatten())
            .map(|found| found.start_position)
            .and_then(|start| {
                outline
                    .nodes
                    .iter()
                    .position(|n| n.is_chapter() && n.start_position == start)
            });
        let percent = if book.total_length == 0 {
            0.0
        } else {
            position as f64 * 100.0 / book.total_length as f64
        };

        Ok(ReadingProgress {
            book_id,
            position,
            total_length: book.total_length,
            percent,
            chapter_index,
            chapter: chapter_index.map(|i| outline.nodes[i].clone()),
        })
    }

    /// 阅读记录，最新的在前
    pub fn reading_history(&self, book_id: i64, limit: usize) -> ReaderResult<Vec<ReadingRecord>> {
        self.book(book_id)?;
        Ok(db::list_reading_records(&self.conn, book_id, limit)?)
    }

    pub fn add_note(&self, book_id: i64, draft: &NoteDraft) -> ReaderResult<Note> {
        let total_length = self.book(book_id)?.total_length;
        if draft.content.trim().is_empty() {
            return Err(ReaderError::InvalidNote("内容不能为空".to_string()));
        }
        if draft.position > total_length {
            return Err(ReaderError::InvalidPosition {
                position: draft.position,
                total_length,
            });
        }
        let note_id = db::insert_note(&self.conn, book_id, draft)?;
        tracing::debug!(book_id, note_id, "笔记已添加");
        self.note(note_id)
    }

    pub fn note(&self, note_id: i64) -> ReaderResult<Note> {
        db::get_note(&self.conn, note_id)?.ok_or(ReaderError::NoteNotFound(note_id))
    }

    /// 某本书的全部笔记，按位置排序
    pub fn notes(&self, book_id: i64) -> ReaderResult<Vec<Note>> {
        self.book(book_id)?;
        Ok(db::list_notes(&self.conn, book_id)?)
    }

    pub fn update_note(&self, note_id: i64, update: &NoteUpdate) -> ReaderResult<Note> {
        if update.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ReaderError::InvalidNote("内容不能为空".to_string()));
        }
        if !db::update_note(&self.conn, note_id, update)? {
            return Err(ReaderError::NoteNotFound(note_id));
        }
        self.note(note_id)
    }

    pub fn delete_note(&self, note_id: i64) -> ReaderResult<()> {
        if !db::delete_note(&self.conn, note_id)? {
            return Err(ReaderError::NoteNotFound(note_id));
        }
        Ok(())
    }

    pub fn delete_book(&self, book_id: i64) -> ReaderResult<()> {
        if !db::delete_book(&self.conn, book_id)? {
            return Err(ReaderError::BookNotFound(book_id));
        }
        tracing::info!(book_id, "书籍已删除");
        Ok(())
    }
}
