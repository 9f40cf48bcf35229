use crate::cli::open_db;
use crate::db::set_note;
use crate::error::Result;

pub fn run(id: i64, text: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    set_note(&conn, id, text)?;
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(_) => println!("Noted transaction {id}"),
        None => println!("Cleared note on transaction {id}"),
    }
    Ok(())
}
