use std::cmp::Ordering;

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::models::Transaction;

/// Category filter value that matches every transaction.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Case-insensitive substring of code or recipient; empty matches all.
    pub search: String,
    /// Exact category name; `None`, empty or "all" match all.
    pub category: Option<String>,
    /// Inclusive from the start of this day.
    pub from: Option<NaiveDate>,
    /// Inclusive through the end of this day.
    pub to: Option<NaiveDate>,
}

impl Filter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        self.matches_search(txn) && self.matches_category(txn) && self.matches_dates(txn)
    }

    fn matches_search(&self, txn: &Transaction) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        txn.code.to_lowercase().contains(&needle) || txn.recipient.to_lowercase().contains(&needle)
    }

    fn matches_category(&self, txn: &Transaction) -> bool {
        match self.category.as_deref() {
            None | Some("") | Some(ALL_CATEGORIES) => true,
            Some(wanted) => txn.category.as_deref() == Some(wanted),
        }
    }

    fn matches_dates(&self, txn: &Transaction) -> bool {
        let day = txn.datetime.date();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

pub fn select(txns: &[Transaction], filter: &Filter) -> Vec<Transaction> {
    txns.iter().filter(|t| filter.matches(t)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Code,
    Recipient,
    Amount,
    Datetime,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::Datetime,
            order: SortOrder::Desc,
        }
    }
}

impl SortConfig {
    /// Selecting the field already sorted ascending flips it to descending;
    /// anything else starts ascending.
    pub fn select_field(self, field: SortField) -> Self {
        let order = if self.field == field && self.order == SortOrder::Asc {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        Self { field, order }
    }
}

fn text_key(value: &str) -> String {
    value.to_lowercase()
}

fn compare(a: &Transaction, b: &Transaction, field: SortField) -> Ordering {
    match field {
        SortField::Amount => a.amount.total_cmp(&b.amount),
        SortField::Datetime => a.datetime.cmp(&b.datetime),
        SortField::Code => text_key(&a.code).cmp(&text_key(&b.code)),
        SortField::Recipient => text_key(&a.recipient).cmp(&text_key(&b.recipient)),
        SortField::Category => text_key(a.category.as_deref().unwrap_or(""))
            .cmp(&text_key(b.category.as_deref().unwrap_or(""))),
    }
}

/// Stable sort: transactions with equal keys keep their input order in
/// either direction.
pub fn order(mut txns: Vec<Transaction>, config: SortConfig) -> Vec<Transaction> {
    txns.sort_by(|a, b| {
        let ord = compare(a, b, config.field);
        match config.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    txns
}
