use std::io::Read;

use chrono::Local;

use crate::categorizer::LastWriteWins;
use crate::cli::open_db;
use crate::error::{LedgerError, Result};
use crate::importer::import_text;
use crate::parser::get_by_key;

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        None | Some("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

pub fn run(file: Option<&str>, name: Option<String>, format: Option<&str>) -> Result<()> {
    let format = match format {
        Some(key) => Some(get_by_key(key).ok_or_else(|| LedgerError::UnknownFormat(key.to_string()))?),
        None => None,
    };
    let text = read_input(file)?;
    let name = name.unwrap_or_else(|| format!("Import {}", Local::now().format("%Y-%m-%d %H:%M")));

    let conn = open_db()?;
    let result = import_text(&conn, &name, &text, format, &LastWriteWins)?;

    println!("Created import {} \"{name}\"", result.import_id);
    println!(
        "{} imported, {} lines skipped, {} categorized from history",
        result.imported, result.skipped_lines, result.categorized
    );
    Ok(())
}
