use rusqlite::Connection;
use tracing::{debug, info};

use crate::categorizer::{categorize_transactions, CategoryGuesser};
use crate::db::insert_import;
use crate::error::{LedgerError, Result};
use crate::parser::{parse_batch, parse_batch_with, LineFormat};

#[derive(Debug)]
pub struct ImportResult {
    pub import_id: i64,
    pub imported: usize,
    pub categorized: usize,
    pub skipped_lines: usize,
}

/// Parse pasted SMS text, guess categories from earlier imports and store the
/// batch as a new import.
pub fn import_text(
    conn: &Connection,
    name: &str,
    text: &str,
    format: Option<LineFormat>,
    guesser: &dyn CategoryGuesser,
) -> Result<ImportResult> {
    let candidate_lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if candidate_lines == 0 {
        return Err(LedgerError::Other("No SMS text provided".to_string()));
    }

    let mut txns = match format {
        Some(format) => parse_batch_with(format, text),
        None => parse_batch(text),
    };
    debug!(lines = candidate_lines, parsed = txns.len(), "parsed batch");
    if txns.is_empty() {
        return Err(LedgerError::NoTransactions);
    }

    // History is read before the new rows exist, so a batch never feeds itself.
    let categorize = categorize_transactions(&mut txns, conn, guesser);
    let import_id = insert_import(conn, name, &txns)?;

    info!(
        import_id,
        imported = txns.len(),
        categorized = categorize.categorized,
        uncategorized = categorize.uncategorized,
        "import complete"
    );
    Ok(ImportResult {
        import_id,
        imported: txns.len(),
        categorized: categorize.categorized,
        skipped_lines: candidate_lines - txns.len(),
    })
}
