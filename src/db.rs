use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::categorizer::HistoryLookup;
use crate::error::{LedgerError, Result};
use crate::models::{AnalysisReport, Category, HistoryEntry, Import, Transaction};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    total_count INTEGER NOT NULL,
    completed_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    code TEXT NOT NULL,
    recipient TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount >= 0),
    datetime TEXT NOT NULL,
    category TEXT,
    notes TEXT,
    created_at TEXT DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_recipient ON transactions(recipient);
CREATE INDEX IF NOT EXISTS idx_transactions_import ON transactions(import_id);

CREATE TABLE IF NOT EXISTS analysis_reports (
    id INTEGER PRIMARY KEY,
    import_id INTEGER NOT NULL,
    analysis_text TEXT NOT NULL,
    document BLOB,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);
";

const DEFAULT_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Bills & Utilities",
    "Entertainment",
    "Healthcare",
    "Others",
];

/// Storage format for transaction timestamps. Parsing also accepts the
/// fractional seconds SQLite writes for `created_at`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

/// Create an import and its transactions in one SQLite transaction. Returns
/// the new import id.
pub fn insert_import(conn: &Connection, name: &str, txns: &[Transaction]) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let completed = txns.iter().filter(|t| t.category.is_some()).count() as i64;
    tx.execute(
        "INSERT INTO imports (name, total_count, completed_count) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, txns.len() as i64, completed],
    )?;
    let import_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions (import_id, code, recipient, amount, datetime, category, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for txn in txns {
            stmt.execute(rusqlite::params![
                import_id,
                txn.code,
                txn.recipient,
                txn.amount,
                txn.datetime.format(TIMESTAMP_FORMAT).to_string(),
                txn.category,
                txn.notes,
            ])?;
        }
    }
    tx.commit()?;
    info!(import_id, total = txns.len(), completed, "created import");
    Ok(import_id)
}

fn import_from_row(row: &Row) -> rusqlite::Result<Import> {
    Ok(Import {
        id: row.get(0)?,
        name: row.get(1)?,
        total_count: row.get(2)?,
        completed_count: row.get(3)?,
        created_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

pub fn list_imports(conn: &Connection) -> Result<Vec<Import>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, total_count, completed_count, created_at FROM imports \
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([], import_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_import(conn: &Connection, import_id: i64) -> Result<Import> {
    conn.query_row(
        "SELECT id, name, total_count, completed_count, created_at FROM imports WHERE id = ?1",
        [import_id],
        import_from_row,
    )
    .optional()?
    .ok_or(LedgerError::UnknownImport(import_id))
}

/// Recount categorized transactions for an import.
fn refresh_completed_count(conn: &Connection, import_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE imports SET completed_count = \
         (SELECT count(*) FROM transactions WHERE import_id = ?1 AND category IS NOT NULL) \
         WHERE id = ?1",
        [import_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// All transactions of an import, newest first.
pub fn get_transactions(conn: &Connection, import_id: i64) -> Result<Vec<Transaction>> {
    get_import(conn, import_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, code, recipient, amount, datetime, category, import_id, notes \
         FROM transactions WHERE import_id = ?1 ORDER BY datetime DESC, id",
    )?;
    let rows = stmt
        .query_map([import_id], |row| {
            let raw: String = row.get(4)?;
            Ok(Transaction {
                id: row.get(0)?,
                code: row.get(1)?,
                recipient: row.get(2)?,
                amount: row.get(3)?,
                datetime: parse_timestamp(4, &raw)?,
                category: row.get(5)?,
                import_id: row.get(6)?,
                notes: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Set (or clear) the category of the given transactions and keep every
/// affected import's `completed_count` in step, all in one SQLite
/// transaction. Returns the number of transactions updated.
pub fn set_category(conn: &Connection, ids: &[i64], category: Option<&str>) -> Result<usize> {
    if let Some(name) = category {
        if !category_exists(conn, name)? {
            return Err(LedgerError::UnknownCategory(name.to_string()));
        }
    }

    let tx = conn.unchecked_transaction()?;
    let mut updated = 0usize;
    let mut touched = BTreeSet::new();
    for id in ids {
        let import_id: Option<i64> = tx
            .query_row("SELECT import_id FROM transactions WHERE id = ?1", [id], |r| r.get(0))
            .optional()?;
        let Some(import_id) = import_id else {
            debug!(id, "no such transaction");
            continue;
        };
        tx.execute(
            "UPDATE transactions SET category = ?1 WHERE id = ?2",
            rusqlite::params![category, id],
        )?;
        touched.insert(import_id);
        updated += 1;
    }
    for import_id in touched {
        refresh_completed_count(&tx, import_id)?;
    }
    tx.commit()?;
    Ok(updated)
}

/// Attach a note to a transaction; `None` or blank text removes it.
pub fn set_note(conn: &Connection, id: i64, note: Option<&str>) -> Result<()> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let updated = conn.execute(
        "UPDATE transactions SET notes = ?1 WHERE id = ?2",
        rusqlite::params![note, id],
    )?;
    if updated == 0 {
        return Err(LedgerError::Other(format!("Transaction not found: id {id}")));
    }
    Ok(())
}

/// Previously categorized transactions for a recipient, oldest first.
pub fn category_history(conn: &Connection, recipient: &str) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT recipient, category, created_at FROM transactions \
         WHERE recipient = ?1 AND category IS NOT NULL ORDER BY created_at, id",
    )?;
    let rows = stmt
        .query_map([recipient], |row| {
            let raw: String = row.get(2)?;
            Ok(HistoryEntry {
                recipient: row.get(0)?,
                category: row.get(1)?,
                created_at: parse_timestamp(2, &raw)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl HistoryLookup for Connection {
    fn category_history(&self, recipient: &str) -> Result<Vec<HistoryEntry>> {
        category_history(self, recipient)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn category_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM categories WHERE name = ?1")?;
    Ok(stmt.exists([name])?)
}

pub fn add_category(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Other("Category name cannot be empty".to_string()));
    }
    if category_exists(conn, name)? {
        return Err(LedgerError::Other(format!("Category already exists: {name}")));
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Analysis reports
// ---------------------------------------------------------------------------

pub fn save_report(
    conn: &Connection,
    import_id: i64,
    analysis_text: &str,
    document: Option<&[u8]>,
) -> Result<i64> {
    get_import(conn, import_id)?;
    conn.execute(
        "INSERT INTO analysis_reports (import_id, analysis_text, document) VALUES (?1, ?2, ?3)",
        rusqlite::params![import_id, analysis_text, document],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn latest_report(conn: &Connection, import_id: i64) -> Result<Option<AnalysisReport>> {
    let report = conn
        .query_row(
            "SELECT id, import_id, analysis_text, document, created_at FROM analysis_reports \
             WHERE import_id = ?1 ORDER BY id DESC LIMIT 1",
            [import_id],
            |row| {
                Ok(AnalysisReport {
                    id: row.get(0)?,
                    import_id: row.get(1)?,
                    analysis_text: row.get(2)?,
                    document: row.get(3)?,
                    created_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            },
        )
        .optional()?;
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub(crate) fn txn(code: &str, recipient: &str, amount: f64, category: Option<&str>) -> Transaction {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 15, 0)
            .unwrap();
        let mut t = Transaction::parsed(code.to_string(), recipient.to_string(), amount, datetime);
        t.category = category.map(str::to_string);
        t
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["categories", "imports", "transactions", "analysis_reports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[test]
    fn test_insert_import_round_trips_transactions() {
        let (_dir, conn) = test_db();
        let txns = vec![
            txn("QA1", "Jane Doe", 1200.0, None),
            txn("QB2", "KPLC", 500.5, Some("Bills & Utilities")),
        ];
        let import_id = insert_import(&conn, "March", &txns).unwrap();

        let import = get_import(&conn, import_id).unwrap();
        assert_eq!(import.name, "March");
        assert_eq!(import.total_count, 2);
        assert_eq!(import.completed_count, 1);

        let stored = get_transactions(&conn, import_id).unwrap();
        assert_eq!(stored.len(), 2);
        let kplc = stored.iter().find(|t| t.code == "QB2").unwrap();
        assert_eq!(kplc.amount, 500.5);
        assert_eq!(kplc.datetime, txns[1].datetime);
        assert_eq!(kplc.import_id, Some(import_id));
        assert!(kplc.id.is_some());
    }

    #[test]
    fn test_get_transactions_newest_first() {
        let (_dir, conn) = test_db();
        let mut early = txn("QA1", "Jane", 1.0, None);
        early.datetime = early.datetime - chrono::Duration::days(2);
        let late = txn("QB2", "Jane", 2.0, None);
        let import_id = insert_import(&conn, "x", &[early, late]).unwrap();
        let stored = get_transactions(&conn, import_id).unwrap();
        assert_eq!(stored[0].code, "QB2");
        assert_eq!(stored[1].code, "QA1");
    }

    #[test]
    fn test_unknown_import() {
        let (_dir, conn) = test_db();
        let err = get_transactions(&conn, 42).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownImport(42)));
    }

    #[test]
    fn test_set_category_keeps_completed_count_consistent() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(
            &conn,
            "x",
            &[txn("A", "Jane", 1.0, None), txn("B", "Joe", 2.0, None), txn("C", "Ann", 3.0, None)],
        )
        .unwrap();
        let ids: Vec<i64> = get_transactions(&conn, import_id)
            .unwrap()
            .iter()
            .filter_map(|t| t.id)
            .collect();

        let updated = set_category(&conn, &ids[..2], Some("Shopping")).unwrap();
        assert_eq!(updated, 2);
        assert_eq!(get_import(&conn, import_id).unwrap().completed_count, 2);

        // re-categorizing an already categorized row does not double count
        set_category(&conn, &ids[..1], Some("Others")).unwrap();
        assert_eq!(get_import(&conn, import_id).unwrap().completed_count, 2);

        set_category(&conn, &ids[..1], None).unwrap();
        assert_eq!(get_import(&conn, import_id).unwrap().completed_count, 1);
    }

    #[test]
    fn test_set_category_rejects_unknown_category() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(&conn, "x", &[txn("A", "Jane", 1.0, None)]).unwrap();
        let id = get_transactions(&conn, import_id).unwrap()[0].id.unwrap();
        let err = set_category(&conn, &[id], Some("Nope")).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCategory(_)));
        assert_eq!(get_import(&conn, import_id).unwrap().completed_count, 0);
    }

    #[test]
    fn test_set_category_skips_missing_ids() {
        let (_dir, conn) = test_db();
        insert_import(&conn, "x", &[txn("A", "Jane", 1.0, None)]).unwrap();
        assert_eq!(set_category(&conn, &[999], Some("Others")).unwrap(), 0);
    }

    #[test]
    fn test_set_note_and_clear() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(&conn, "x", &[txn("A", "Jane", 1.0, None)]).unwrap();
        let id = get_transactions(&conn, import_id).unwrap()[0].id.unwrap();

        set_note(&conn, id, Some("  rent share ")).unwrap();
        let stored = get_transactions(&conn, import_id).unwrap();
        assert_eq!(stored[0].notes.as_deref(), Some("rent share"));

        set_note(&conn, id, Some("   ")).unwrap();
        assert!(get_transactions(&conn, import_id).unwrap()[0].notes.is_none());

        assert!(set_note(&conn, 999, Some("orphan")).is_err());
    }

    #[test]
    fn test_category_history_only_categorized_rows() {
        let (_dir, conn) = test_db();
        insert_import(
            &conn,
            "x",
            &[
                txn("A", "Java House", 1.0, Some("Food & Dining")),
                txn("B", "Java House", 2.0, None),
                txn("C", "Uber", 3.0, Some("Transportation")),
            ],
        )
        .unwrap();
        let history = conn.category_history("Java House").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].category.as_deref(), Some("Food & Dining"));
    }

    #[test]
    fn test_add_category() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Rent").unwrap();
        assert!(category_exists(&conn, "Rent").unwrap());
        assert!(add_category(&conn, "Rent").is_err());
        assert!(add_category(&conn, "  ").is_err());
        let names: Vec<String> = list_categories(&conn).unwrap().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"Rent".to_string()));
        assert!(names.contains(&"Food & Dining".to_string()));
    }

    #[test]
    fn test_reports_store_latest() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(&conn, "x", &[txn("A", "Jane", 1.0, None)]).unwrap();
        assert!(latest_report(&conn, import_id).unwrap().is_none());
        save_report(&conn, import_id, "first", None).unwrap();
        save_report(&conn, import_id, "second", Some(b"%PDF-1.4")).unwrap();
        let report = latest_report(&conn, import_id).unwrap().unwrap();
        assert_eq!(report.analysis_text, "second");
        assert_eq!(report.document.as_deref(), Some(&b"%PDF-1.4"[..]));
        assert!(save_report(&conn, 999, "orphan", None).is_err());
    }
}
