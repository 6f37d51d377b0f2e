//! chatdex CLI - searchable archive for chat-assistant conversation exports

use std::path::PathBuf;

use anyhow::Result;
use chatdex_core::export::ExportDocument;
use chatdex_core::ingest::{self, IngestOptions};
use chatdex_core::query::SearchRequest;
use chatdex_core::{Config, Database};
use clap::{Parser, Subcommand};

mod pretty;

#[derive(Debug, Parser)]
#[command(
    name = "chatdex",
    author,
    version,
    about = "Searchable archive for chat-assistant conversation exports",
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest a conversations export into the database
    Ingest {
        /// Path to the export file (conversations.json)
        export: PathBuf,

        /// Limit messages kept per conversation
        #[arg(long)]
        max_messages: Option<usize>,

        /// Only ingest conversations whose title contains this string
        /// (case-insensitive)
        #[arg(long)]
        title_filter: Option<String>,
    },

    /// Search across message bodies
    Search {
        /// Free text plus shorthand filters, e.g. 'refund role:user'
        query: Option<String>,

        /// Inclusive start date, e.g. 2025-01-01
        #[arg(long)]
        since: Option<String>,

        /// Inclusive end date
        #[arg(long)]
        until: Option<String>,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<i64>,

        /// Write results to a CSV file instead of the console
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// List conversations
    List {
        /// Maximum results
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// Rebuild the full-text index from the message store
    RebuildIndex,

    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let config = Config::ensure_at(&config_path)?;

    // Open database
    let db_path = cli.db.unwrap_or_else(|| config.database.clone());
    let db = Database::open(&db_path).await?;

    match cli.command {
        Command::Ingest {
            export,
            max_messages,
            title_filter,
        } => cmd_ingest(&db, &export, max_messages, title_filter).await,
        Command::Search {
            query,
            since,
            until,
            limit,
            csv,
        } => cmd_search(&db, &config, query, since, until, limit, csv).await,
        Command::List { limit } => cmd_list(&db, limit).await,
        Command::RebuildIndex => cmd_rebuild_index(&db).await,
        Command::Stats => cmd_stats(&db).await,
    }
}

async fn cmd_ingest(
    db: &Database,
    export: &std::path::Path,
    max_messages: Option<usize>,
    title_filter: Option<String>,
) -> Result<()> {
    let document = ExportDocument::from_path(export)?;

    let opts = IngestOptions {
        max_messages,
        title_filter,
    };
    let report = ingest::ingest(db, &document, &opts).await?;

    println!(
        "Ingested {} conversation(s) ({} message(s)).",
        report.conversations, report.messages
    );
    if report.failed > 0 {
        eprintln!("{} conversation(s) failed to ingest.", report.failed);
    }

    Ok(())
}

async fn cmd_search(
    db: &Database,
    config: &Config,
    query: Option<String>,
    since: Option<String>,
    until: Option<String>,
    limit: Option<i64>,
    csv: Option<PathBuf>,
) -> Result<()> {
    let req = SearchRequest {
        query: query.unwrap_or_default(),
        since: since.as_deref().map(parse_date).transpose()?,
        until: until.as_deref().map(parse_date).transpose()?,
        limit: limit.unwrap_or(config.search.default_limit),
    };

    let hits = db.search(&req).await?;

    if let Some(csv_path) = csv {
        pretty::write_csv(&csv_path, &hits)?;
        println!("Wrote {} row(s) to {}", hits.len(), csv_path.display());
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for hit in &hits {
        pretty::print_hit(hit);
    }

    Ok(())
}

async fn cmd_list(db: &Database, limit: i64) -> Result<()> {
    let conversations = db.list_conversations(limit).await?;

    if conversations.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    for conv in conversations {
        println!(
            "{} | {} | {}",
            conv.id,
            pretty::ts_to_iso(conv.created_at),
            conv.title
        );
    }

    Ok(())
}

async fn cmd_rebuild_index(db: &Database) -> Result<()> {
    db.rebuild_index().await?;
    println!("Full-text index rebuilt.");
    Ok(())
}

async fn cmd_stats(db: &Database) -> Result<()> {
    println!("Conversations: {}", db.count_conversations().await?);
    println!("Messages: {}", db.count_messages().await?);
    Ok(())
}

/// Parse a calendar-date argument. Flexible formats are accepted; only
/// the date part is kept, since bounds are whole inclusive days.
fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    let parsed = dateparser::parse(raw)
        .map_err(|e| anyhow::anyhow!("Unrecognized date '{raw}': {e}"))?;
    Ok(parsed.date_naive())
}
