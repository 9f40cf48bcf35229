use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::list_imports;
use crate::error::Result;
use crate::fmt::progress;

pub fn run() -> Result<()> {
    let conn = open_db()?;
    let imports = list_imports(&conn)?;
    if imports.is_empty() {
        println!("No imports yet. Run `smsledger import` to add one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Transactions", "Categorized", "Progress", "Created"]);
    for import in imports {
        table.add_row(vec![
            Cell::new(import.id),
            Cell::new(&import.name),
            Cell::new(import.total_count),
            Cell::new(import.completed_count),
            Cell::new(progress(import.completed_count, import.total_count)),
            Cell::new(&import.created_at),
        ]);
    }
    println!("Imports\n{table}");
    Ok(())
}
