use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::{add_category, list_categories};
use crate::error::Result;

pub fn add(name: &str) -> Result<()> {
    let conn = open_db()?;
    add_category(&conn, name)?;
    println!("Added category: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for cat in list_categories(&conn)? {
        table.add_row(vec![Cell::new(cat.id), Cell::new(cat.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}
