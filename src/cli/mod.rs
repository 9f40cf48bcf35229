pub mod analyze;
pub mod categories;
pub mod categorize;
pub mod import;
pub mod imports;
pub mod init;
pub mod list;
pub mod note;
pub mod report;
pub mod status;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::filter::LevelFilter;

use crate::db::get_connection;
use crate::error::{LedgerError, Result};
use crate::filter::{Filter, SortField, SortOrder};
use crate::settings::db_path;

/// Open the configured database, refusing to create an empty one.
pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(LedgerError::Other(
            "Database not found. Run `smsledger init` to set up.".to_string(),
        ));
    }
    get_connection(&path)
}

#[derive(Parser)]
#[command(
    name = "smsledger",
    version,
    about = "Turn pasted M-Pesa SMS messages into a categorized spending ledger."
)]
pub struct Cli {
    /// Log verbosity for smsledger itself (RUST_LOG overrides).
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive match on code or recipient
    #[arg(long)]
    pub search: Option<String>,
    /// Only this category ("all" for every category)
    #[arg(long)]
    pub category: Option<String>,
    /// First day to include: YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day to include: YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn into_filter(self) -> Filter {
        Filter {
            search: self.search.unwrap_or_default(),
            category: self.category,
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for smsledger data (default: ~/Documents/smsledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Parse pasted SMS text into a new import.
    Import {
        /// File with one message per line; reads stdin when omitted or "-"
        file: Option<String>,
        /// Import name (default: "Import YYYY-MM-DD HH:MM")
        #[arg(long)]
        name: Option<String>,
        /// Message format key (e.g. mpesa); detected per line when omitted
        #[arg(long)]
        format: Option<String>,
    },
    /// List imports with categorization progress.
    Imports,
    /// Show the transactions of an import.
    List {
        /// Import id
        import_id: i64,
        #[command(flatten)]
        filter: FilterArgs,
        /// Sort field (default: datetime, newest first)
        #[arg(long, value_enum)]
        sort: Option<SortField>,
        /// Sort direction
        #[arg(long, value_enum)]
        order: Option<SortOrder>,
    },
    /// Set or clear the category of transactions.
    Categorize {
        /// Transaction ids
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Category name to assign
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        category: Option<String>,
        /// Mark the transactions uncategorized
        #[arg(long)]
        clear: bool,
    },
    /// Attach a note to a transaction, or clear it when no text is given.
    Note {
        /// Transaction id
        id: i64,
        /// Note text
        text: Option<String>,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: Option<CategoriesCommands>,
    },
    /// Spending totals for an import.
    Report {
        /// Import id
        import_id: i64,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        /// How many recipients to rank (default from settings)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Ask the configured summarizer for spending insights.
    Analyze {
        /// Import id
        import_id: i64,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the prompt instead of running the summarizer
        #[arg(long = "prompt-only")]
        prompt_only: bool,
        /// Store this file with the analysis (e.g. a rendered PDF)
        #[arg(long)]
        document: Option<String>,
        /// Summarizer command overriding settings.json
        #[arg(long)]
        command: Option<String>,
    },
    /// Show the latest stored analysis of an import.
    Analysis {
        /// Import id
        import_id: i64,
        /// Write the stored document to this path
        #[arg(long = "document-out")]
        document_out: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List all categories.
    List,
    /// Add a category.
    Add {
        /// Category name
        name: String,
    },
}
