mod analysis;
mod categorizer;
mod cli;
mod db;
mod error;
mod filter;
mod fmt;
mod importer;
mod models;
mod parser;
mod reports;
mod settings;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{CategoriesCommands, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);
    debug!("log level set to {}", cli.log_level.to_string().to_lowercase());

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, name, format } => {
            cli::import::run(file.as_deref(), name, format.as_deref())
        }
        Commands::Imports => cli::imports::run(),
        Commands::List {
            import_id,
            filter,
            sort,
            order,
        } => cli::list::run(import_id, filter.into_filter(), sort, order),
        Commands::Categorize {
            ids,
            category,
            clear,
        } => {
            let category = if clear { None } else { category };
            cli::categorize::run(&ids, category.as_deref())
        }
        Commands::Note { id, text } => cli::note::run(id, text.as_deref()),
        Commands::Categories { command } => match command.unwrap_or(CategoriesCommands::List) {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Add { name } => cli::categories::add(&name),
        },
        Commands::Report {
            import_id,
            filter,
            json,
            top,
        } => cli::report::run(import_id, filter.into_filter(), json, top),
        Commands::Analyze {
            import_id,
            filter,
            prompt_only,
            document,
            command,
        } => cli::analyze::run(
            import_id,
            filter.into_filter(),
            prompt_only,
            document.as_deref(),
            command,
        ),
        Commands::Analysis {
            import_id,
            document_out,
        } => cli::analyze::show(import_id, document_out.as_deref()),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` wins when set; otherwise only this crate
/// logs, at `level`.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
