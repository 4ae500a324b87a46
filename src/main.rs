use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser as ClapParser, Subcommand};
use serde::Serialize;
use tracing::error;

use deep_reader_outline::logging::init_logging;
use deep_reader_outline::{
    BookFormat, ExtractorConfig, Library, NoteDraft, NoteKind, NoteUpdate, OutlineResult,
    ParseOptions, ParserRouter, ReaderResult,
};

#[derive(ClapParser, Debug)]
#[command(
    name = "deep-reader-outline",
    version,
    about = "解析 TXT 电子书的分卷/章节目录，并在本地书库中存储与检索"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// 书库数据库路径
    #[arg(long, global = true, env = "DEEP_READER_DB", default_value = "library.db")]
    db: PathBuf,

    /// JSON 格式的解析配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 回退分章的窗口大小（字符数）
    #[arg(long, global = true)]
    window: Option<usize>,

    /// 以 JSON 输出
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// 日志级别（如 debug、info），默认读取 RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 解析文件并打印目录（不写入书库）；`-` 表示从标准输入读取
    Outline {
        file: PathBuf,
        #[arg(long)]
        encoding: Option<String>,
    },
    /// 导入文件到书库
    Import {
        file: PathBuf,
        #[arg(long)]
        encoding: Option<String>,
    },
    /// 列出书库中的书籍
    Books,
    /// 打印已导入书籍的目录
    Chapters { book_id: i64 },
    /// 读取正文：按目录节点或字符区间
    Read {
        book_id: i64,
        /// 目录节点下标
        #[arg(long, conflicts_with_all = ["start", "end"])]
        node: Option<usize>,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long)]
        end: Option<usize>,
    },
    /// 用当前配置重新解析目录
    Reparse { book_id: i64 },
    /// 删除书籍及其目录
    Delete { book_id: i64 },
    /// 查看或更新阅读进度
    Progress {
        book_id: i64,
        /// 新的阅读位置（字符偏移）
        #[arg(long)]
        set: Option<usize>,
        /// 同时列出最近的阅读记录
        #[arg(long)]
        history: Option<usize>,
    },
    /// 管理笔记
    Notes {
        #[command(subcommand)]
        action: NoteAction,
    },
}

#[derive(Subcommand, Debug)]
enum NoteAction {
    /// 列出一本书的笔记
    List { book_id: i64 },
    /// 添加笔记
    Add {
        book_id: i64,
        /// 字符偏移
        #[arg(long)]
        position: usize,
        content: String,
        /// 添加为划线而不是批注
        #[arg(long, default_value_t = false)]
        highlight: bool,
        #[arg(long)]
        color: Option<String>,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// 修改笔记内容、颜色或标签
    Update {
        note_id: i64,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// 删除笔记
    Delete { note_id: i64 },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.global.log_level.as_deref(), cli.global.no_color) {
        eprintln!("{}", err);
        std::process::exit(2);
    }

    if let Err(err) = run(cli) {
        error!(error = %err, "命令执行失败");
        std::process::exit(1);
    }
}

fn load_config(global: &GlobalArgs) -> ReaderResult<ExtractorConfig> {
    let mut config = match &global.config {
        Some(path) => ExtractorConfig::load(path)?,
        None => ExtractorConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(window) = global.window {
        config.fallback_window = window;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> ReaderResult<()> {
    let config = load_config(&cli.global)?;
    let json = cli.global.json;

    match cli.command {
        Commands::Outline { file, encoding } => {
            let outline = parse_file(&file, encoding, config)?;
            print_outline(&outline, json)
        }
        Commands::Import { file, encoding } => {
            let mut library = Library::open(&cli.global.db, config)?;
            let outcome = library.import_file(&file, encoding.as_deref())?;
            if json {
                print_json(&outcome)
            } else {
                let status = if outcome.duplicate { "已存在" } else { "已导入" };
                println!(
                    "{} #{}: {} 卷 / {} 章",
                    status,
                    outcome.book_id,
                    outcome.outline.volume_count(),
                    outcome.outline.chapter_count()
                );
                Ok(())
            }
        }
        Commands::Books => {
            let library = Library::open(&cli.global.db, config)?;
            let books = library.list_books()?;
            if json {
                return print_json(&books);
            }
            for book in books {
                println!(
                    "#{}\t{}\t{}\t{}\t{} 字\t{}",
                    book.id,
                    book.title,
                    book.format,
                    book.encoding,
                    book.total_length,
                    book.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        Commands::Chapters { book_id } => {
            let library = Library::open(&cli.global.db, config)?;
            print_outline(&library.outline(book_id)?, json)
        }
        Commands::Read { book_id, node, start, end } => {
            let library = Library::open(&cli.global.db, config)?;
            if let Some(node) = node {
                let text = library.chapter_text(book_id, node)?;
                if json {
                    return print_json(&text);
                }
                println!("{}", text);
                return Ok(());
            }
            let slice = library.read_range(book_id, start, end.unwrap_or(usize::MAX))?;
            if json {
                print_json(&slice)
            } else {
                println!("{}", slice.content);
                Ok(())
            }
        }
        Commands::Reparse { book_id } => {
            let mut library = Library::open(&cli.global.db, config)?;
            let outline = library.reparse(book_id)?;
            print_outline(&outline, json)
        }
        Commands::Delete { book_id } => {
            let library = Library::open(&cli.global.db, config)?;
            library.delete_book(book_id)?;
            println!("已删除 #{}", book_id);
            Ok(())
        }
        Commands::Progress { book_id, set, history } => {
            let mut library = Library::open(&cli.global.db, config)?;
            let progress = match set {
                Some(position) => library.update_read_pos(book_id, position)?,
                None => library.read_pos(book_id)?,
            };
            let records = match history {
                Some(limit) => library.reading_history(book_id, limit)?,
                None => Vec::new(),
            };
            if json {
                print_json(&progress)?;
                return if history.is_some() { print_json(&records) } else { Ok(()) };
            }
            let chapter = progress
                .chapter
                .as_ref()
                .map(|c| c.title.as_str())
                .unwrap_or("-");
            println!(
                "{} / {} ({:.1}%)  {}",
                progress.position, progress.total_length, progress.percent, chapter
            );
            for record in records {
                println!("{}\t{}", record.created_at.format("%Y-%m-%d %H:%M"), record.position);
            }
            Ok(())
        }
        Commands::Notes { action } => {
            let library = Library::open(&cli.global.db, config)?;
            run_note_action(&library, action, json)
        }
    }
}

fn run_note_action(library: &Library, action: NoteAction, json: bool) -> ReaderResult<()> {
    let note = match action {
        NoteAction::List { book_id } => {
            let notes = library.notes(book_id)?;
            if json {
                return print_json(&notes);
            }
            for note in notes {
                println!(
                    "#{}\t{}\t{}\t{}\t{}",
                    note.id,
                    note.position,
                    note.kind.as_str(),
                    note.color,
                    note.content
                );
            }
            return Ok(());
        }
        NoteAction::Add { book_id, position, content, highlight, color, tag } => {
            let kind = if highlight { NoteKind::Highlight } else { NoteKind::Note };
            let mut draft = NoteDraft::new(kind, content, position);
            if let Some(color) = color {
                draft.color = color;
            }
            draft.tag = tag;
            library.add_note(book_id, &draft)?
        }
        NoteAction::Update { note_id, content, color, tag } => {
            library.update_note(note_id, &NoteUpdate { content, color, tag })?
        }
        NoteAction::Delete { note_id } => {
            library.delete_note(note_id)?;
            println!("已删除笔记 #{}", note_id);
            return Ok(());
        }
    };

    if json {
        print_json(&note)
    } else {
        println!("笔记 #{}: {}", note.id, note.content);
        Ok(())
    }
}

fn parse_file(file: &Path, encoding: Option<String>, config: ExtractorConfig) -> ReaderResult<OutlineResult> {
    let router = ParserRouter::new();
    let options = ParseOptions {
        encoding,
        extractor: config,
    };

    let result = if file == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        router.route_format(BookFormat::Txt)?.parse(&bytes, &options)?
    } else {
        let parser = router.route(file)?;
        let bytes = std::fs::read(file)?;
        parser.parse(&bytes, &options)?
    };
    Ok(result.outline)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ReaderResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outline(outline: &OutlineResult, json: bool) -> ReaderResult<()> {
    if json {
        return print_json(outline);
    }

    for (index, node) in outline.nodes.iter().enumerate() {
        let indent = if node.is_chapter() && node.parent_id.is_some() { "  " } else { "" };
        let marker = if node.synthetic { " *" } else { "" };
        println!(
            "{:>4} {}[{}#{}] {}{}  [{}, {})",
            index,
            indent,
            node.kind.as_str(),
            node.sequence_id,
            node.title,
            marker,
            node.start_position,
            node.end_position
        );
    }
    println!(
        "共 {} 卷 / {} 章，{} 字",
        outline.volume_count(),
        outline.chapter_count(),
        outline.total_length
    );
    Ok(())
}
