use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::outline::{NodeKind, OutlineNode, OutlineResult};
use crate::parser::BookFormat;

const SCHEMA: &str = "
    PRAGMA encoding = 'UTF-8';
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        format TEXT NOT NULL,
        encoding TEXT NOT NULL,
        file_path TEXT,
        content TEXT NOT NULL,
        content_hash TEXT NOT NULL UNIQUE,
        total_length INTEGER NOT NULL,
        last_read_pos INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS outline_nodes (
        id INTEGER PRIMARY KEY,
        book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        node_index INTEGER NOT NULL,
        kind TEXT NOT NULL,
        sequence_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        parent_index INTEGER,
        start_position INTEGER NOT NULL,
        end_position INTEGER NOT NULL,
        start_line INTEGER NOT NULL,
        synthetic INTEGER NOT NULL DEFAULT 0,
        UNIQUE (book_id, node_index)
    );

    CREATE INDEX IF NOT EXISTS idx_outline_nodes_book ON outline_nodes (book_id, node_index);

    CREATE TABLE IF NOT EXISTS reading_records (
        id INTEGER PRIMARY KEY,
        book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY,
        book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        content TEXT NOT NULL,
        position INTEGER NOT NULL,
        color TEXT NOT NULL,
        tag TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_notes_book ON notes (book_id, position);
";

/// 书籍记录（不含正文）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub format: BookFormat,
    pub encoding: String,
    pub file_path: Option<String>,
    pub content_hash: String,
    pub total_length: usize,
    /// 上次阅读位置（字符偏移）
    pub last_read_pos: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一条阅读记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub id: i64,
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

/// 笔记类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    /// 划线
    Highlight,
    /// 批注
    Note,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Highlight => "highlight",
            NoteKind::Note => "note",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "highlight" => Some(NoteKind::Highlight),
            "note" => Some(NoteKind::Note),
            _ => None,
        }
    }
}

/// 笔记
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub book_id: i64,
    pub kind: NoteKind,
    pub content: String,
    /// 笔记所在的字符偏移
    pub position: usize,
    pub color: String,
    pub tag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建笔记的内容
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NoteDraft {
    pub kind: NoteKind,
    pub content: String,
    pub position: usize,
    pub color: String,
    pub tag: String,
}

impl NoteDraft {
    pub const DEFAULT_COLOR: &'static str = "yellow";

    pub fn new(kind: NoteKind, content: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            content: content.into(),
            position,
            color: Self::DEFAULT_COLOR.to_string(),
            tag: String::new(),
        }
    }
}

/// 笔记的部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub color: Option<String>,
    pub tag: Option<String>,
}

/// 待插入的书籍
#[derive(Debug, Clone)]
pub struct NewBook<'a> {
    pub title: &'a str,
    pub format: BookFormat,
    pub encoding: &'a str,
    pub file_path: Option<&'a str>,
    pub content: &'a str,
    pub content_hash: &'a str,
    pub total_length: usize,
}

pub fn init_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// 内存数据库（测试与一次性解析使用）
pub fn init_memory_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

fn parse_time(column: usize, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("无效的时间 {}: {}", raw, e)))
}

const BOOK_COLUMNS: &str =
    "id, title, format, encoding, file_path, content_hash, total_length, created_at, updated_at, last_read_pos";

fn book_from_row(row: &Row<'_>) -> Result<BookRecord> {
    let format: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(BookRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        format: BookFormat::from_name(&format)
            .ok_or_else(|| conversion_error(2, format!("未知格式: {}", format)))?,
        encoding: row.get(3)?,
        file_path: row.get(4)?,
        content_hash: row.get(5)?,
        total_length: to_usize(row.get(6)?),
        last_read_pos: to_usize(row.get(9)?),
        created_at: parse_time(7, &created_at)?,
        updated_at: parse_time(8, &updated_at)?,
    })
}

const NOTE_COLUMNS: &str = "id, book_id, kind, content, position, color, tag, created_at, updated_at";

fn note_from_row(row: &Row<'_>) -> Result<Note> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Note {
        id: row.get(0)?,
        book_id: row.get(1)?,
        kind: NoteKind::from_str_opt(&kind)
            .ok_or_else(|| conversion_error(2, format!("未知笔记类型: {}", kind)))?,
        content: row.get(3)?,
        position: to_usize(row.get(4)?),
        color: row.get(5)?,
        tag: row.get(6)?,
        created_at: parse_time(7, &created_at)?,
        updated_at: parse_time(8, &updated_at)?,
    })
}

pub fn insert_book(conn: &Connection, book: &NewBook<'_>) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO books (title, format, encoding, file_path, content, content_hash, total_length, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            book.title,
            book.format.as_str(),
            book.encoding,
            book.file_path,
            book.content,
            book.content_hash,
            to_i64(book.total_length),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_book_by_hash(conn: &Connection, content_hash: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM books WHERE content_hash = ?1",
        [content_hash],
        |row| row.get(0),
    )
    .optional()
}

pub fn get_book(conn: &Connection, book_id: i64) -> Result<Option<BookRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM books WHERE id = ?1", BOOK_COLUMNS),
        [book_id],
        book_from_row,
    )
    .optional()
}

pub fn list_books(conn: &Connection) -> Result<Vec<BookRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM books ORDER BY id DESC", BOOK_COLUMNS))?;
    let books = stmt.query_map([], book_from_row)?;
    books.collect()
}

pub fn get_book_content(conn: &Connection, book_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT content FROM books WHERE id = ?1",
        [book_id],
        |row| row.get(0),
    )
    .optional()
}

/// 按字符区间读取正文
///
/// SQLite 的 `substr` 对 TEXT 按字符计数，起点从 1 开始。
pub fn read_content_range(conn: &Connection, book_id: i64, start: usize, end: usize) -> Result<Option<String>> {
    let len = end.saturating_sub(start);
    conn.query_row(
        "SELECT substr(content, ?2, ?3) FROM books WHERE id = ?1",
        params![book_id, to_i64(start) + 1, to_i64(len)],
        |row| row.get(0),
    )
    .optional()
}

/// 在同一个事务中插入书籍和目录，任一步失败都不会留下记录
pub fn insert_book_with_outline(conn: &mut Connection, book: &NewBook<'_>, outline: &OutlineResult) -> Result<i64> {
    let tx = conn.transaction()?;
    let book_id = insert_book(&tx, book)?;
    replace_outline(&tx, book_id, outline)?;
    tx.commit()?;
    Ok(book_id)
}

/// 保存目录（覆盖该书已有的目录）
pub fn save_outline(conn: &mut Connection, book_id: i64, outline: &OutlineResult) -> Result<()> {
    let tx = conn.transaction()?;
    replace_outline(&tx, book_id, outline)?;
    tx.commit()
}

fn replace_outline(tx: &Connection, book_id: i64, outline: &OutlineResult) -> Result<()> {
    tx.execute("DELETE FROM outline_nodes WHERE book_id = ?1", [book_id])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO outline_nodes
                (book_id, node_index, kind, sequence_id, title, parent_index, start_position, end_position, start_line, synthetic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for (index, node) in outline.nodes.iter().enumerate() {
            stmt.execute(params![
                book_id,
                to_i64(index),
                node.kind.as_str(),
                node.sequence_id,
                node.title,
                node.parent_id.map(to_i64),
                to_i64(node.start_position),
                to_i64(node.end_position),
                to_i64(node.start_line),
                node.synthetic,
            ])?;
        }
    }
    tx.execute(
        "UPDATE books SET total_length = ?2, updated_at = ?3 WHERE id = ?1",
        params![book_id, to_i64(outline.total_length), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// 读取目录；书籍不存在时返回 `None`
pub fn load_outline(conn: &Connection, book_id: i64) -> Result<Option<OutlineResult>> {
    let Some(total_length) = conn
        .query_row(
            "SELECT total_length FROM books WHERE id = ?1",
            [book_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT kind, sequence_id, title, parent_index, start_position, end_position, start_line, synthetic
         FROM outline_nodes WHERE book_id = ?1 ORDER BY node_index",
    )?;
    let nodes = stmt
        .query_map([book_id], |row| {
            let kind: String = row.get(0)?;
            Ok(OutlineNode {
                kind: NodeKind::from_str_opt(&kind)
                    .ok_or_else(|| conversion_error(0, format!("未知节点类型: {}", kind)))?,
                sequence_id: row.get(1)?,
                title: row.get(2)?,
                parent_id: row.get::<_, Option<i64>>(3)?.map(to_usize),
                start_position: to_usize(row.get(4)?),
                end_position: to_usize(row.get(5)?),
                start_line: to_usize(row.get(6)?),
                synthetic: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(OutlineResult {
        nodes,
        total_length: to_usize(total_length),
    }))
}

/// 更新阅读位置并追加一条阅读记录。书籍不存在时返回 false
pub fn update_read_pos(conn: &mut Connection, book_id: i64, position: usize) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    let updated = tx.execute(
        "UPDATE books SET last_read_pos = ?2, updated_at = ?3 WHERE id = ?1",
        params![book_id, to_i64(position), now],
    )?;
    if updated == 0 {
        return Ok(false);
    }
    tx.execute(
        "INSERT INTO reading_records (book_id, position, created_at) VALUES (?1, ?2, ?3)",
        params![book_id, to_i64(position), now],
    )?;
    tx.commit()?;
    Ok(true)
}

/// 阅读记录，最新的在前
pub fn list_reading_records(conn: &Connection, book_id: i64, limit: usize) -> Result<Vec<ReadingRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, position, created_at FROM reading_records
         WHERE book_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let records = stmt.query_map(params![book_id, to_i64(limit)], |row| {
        let created_at: String = row.get(2)?;
        Ok(ReadingRecord {
            id: row.get(0)?,
            position: to_usize(row.get(1)?),
            created_at: parse_time(2, &created_at)?,
        })
    })?;
    records.collect()
}

pub fn insert_note(conn: &Connection, book_id: i64, draft: &NoteDraft) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO notes (book_id, kind, content, position, color, tag, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            book_id,
            draft.kind.as_str(),
            draft.content,
            to_i64(draft.position),
            draft.color,
            draft.tag,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_note(conn: &Connection, note_id: i64) -> Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
        [note_id],
        note_from_row,
    )
    .optional()
}

/// 某本书的笔记，按位置排序
pub fn list_notes(conn: &Connection, book_id: i64) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM notes WHERE book_id = ?1 ORDER BY position, id",
        NOTE_COLUMNS
    ))?;
    let notes = stmt.query_map([book_id], note_from_row)?;
    notes.collect()
}

/// 部分更新笔记。返回是否找到该笔记
pub fn update_note(conn: &Connection, note_id: i64, update: &NoteUpdate) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE notes SET
            content = COALESCE(?2, content),
            color = COALESCE(?3, color),
            tag = COALESCE(?4, tag),
            updated_at = ?5
         WHERE id = ?1",
        params![note_id, update.content, update.color, update.tag, Utc::now().to_rfc3339()],
    )?;
    Ok(updated > 0)
}

pub fn delete_note(conn: &Connection, note_id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
    Ok(deleted > 0)
}

/// 删除书籍，目录、笔记和阅读记录随外键级联删除。返回是否删除了记录
pub fn delete_book(conn: &Connection, book_id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM books WHERE id = ?1", [book_id])?;
    Ok(deleted > 0)
}
