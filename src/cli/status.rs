use crate::db::get_connection;
use crate::error::Result;
use crate::parser::ALL_FORMATS;
use crate::settings::{db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = db_path();

    println!("Data dir:    {}", settings.data_dir);
    println!("Database:    {}", db_path.display());
    println!(
        "Summarizer:  {}",
        settings.summarizer_command.as_deref().unwrap_or("(not set)")
    );
    let formats: Vec<String> = ALL_FORMATS
        .iter()
        .map(|f| format!("{} ({})", f.key(), f.name()))
        .collect();
    println!("Formats:     {}", formats.join(", "));

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;
        let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let uncategorized: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE category IS NULL",
            [],
            |r| r.get(0),
        )?;
        let categories: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;
        let reports: i64 = conn.query_row("SELECT count(*) FROM analysis_reports", [], |r| r.get(0))?;

        println!();
        println!("Imports:        {imports}");
        println!("Transactions:   {transactions}");
        println!("Uncategorized:  {uncategorized}");
        println!("Categories:     {categories}");
        println!("Analyses:       {reports}");
    } else {
        println!();
        println!("Database not found. Run `smsledger init` to set up.");
    }

    Ok(())
}
