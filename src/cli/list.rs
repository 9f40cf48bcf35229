use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::db::{get_import, get_transactions};
use crate::error::Result;
use crate::filter::{order, select, Filter, SortConfig, SortField, SortOrder};
use crate::fmt::money;
use crate::models::UNCATEGORIZED;

/// `--sort` alone behaves like picking a column header: ascending unless the
/// column is already the active ascending one.
fn sort_config(sort: Option<SortField>, direction: Option<SortOrder>) -> SortConfig {
    let mut config = match sort {
        Some(field) => SortConfig::default().select_field(field),
        None => SortConfig::default(),
    };
    if let Some(direction) = direction {
        config.order = direction;
    }
    config
}

pub fn run(import_id: i64, filter: Filter, sort: Option<SortField>, direction: Option<SortOrder>) -> Result<()> {
    let conn = open_db()?;
    let import = get_import(&conn, import_id)?;
    let all = get_transactions(&conn, import_id)?;
    let shown = order(select(&all, &filter), sort_config(sort, direction));

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Recipient", "Amount", "Date", "Category", "Notes"]);
    for txn in &shown {
        let category = match &txn.category {
            Some(name) => Cell::new(name),
            None => Cell::new(UNCATEGORIZED.dimmed()),
        };
        table.add_row(vec![
            Cell::new(txn.id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(&txn.code),
            Cell::new(&txn.recipient),
            Cell::new(money(txn.amount)).set_alignment(CellAlignment::Right),
            Cell::new(txn.datetime.format("%Y-%m-%d %H:%M")),
            category,
            Cell::new(txn.notes.as_deref().unwrap_or_default()),
        ]);
    }

    println!("{} ({} of {} shown)", import.name.bold(), shown.len(), all.len());
    println!("{table}");
    Ok(())
}
