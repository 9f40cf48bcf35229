use crate::cli::open_db;
use crate::db::set_category;
use crate::error::Result;

pub fn run(ids: &[i64], category: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let updated = set_category(&conn, ids, category)?;
    let missing = ids.len() - updated;

    match category {
        Some(name) => println!("{updated} categorized as {name}"),
        None => println!("{updated} marked uncategorized"),
    }
    if missing > 0 {
        println!("{missing} id(s) not found");
    }
    Ok(())
}
