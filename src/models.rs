use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Label used wherever a transaction has no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub code: String,
    pub recipient: String,
    pub amount: f64,
    pub datetime: NaiveDateTime,
    pub category: Option<String>,
    pub import_id: Option<i64>,
    pub notes: Option<String>,
}

impl Transaction {
    /// A freshly parsed, not yet persisted transaction.
    pub fn parsed(code: String, recipient: String, amount: f64, datetime: NaiveDateTime) -> Self {
        Self {
            id: None,
            code,
            recipient,
            amount,
            datetime,
            category: None,
            import_id: None,
            notes: None,
        }
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub id: i64,
    pub name: String,
    pub total_count: i64,
    pub completed_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// One previously categorized transaction, as returned by a history lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub recipient: String,
    pub category: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub id: i64,
    pub import_id: i64,
    pub analysis_text: String,
    pub document: Option<Vec<u8>>,
    pub created_at: String,
}
