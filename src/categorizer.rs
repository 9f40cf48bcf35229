use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{HistoryEntry, Transaction};

/// Source of previously categorized transactions for a counterparty.
pub trait HistoryLookup {
    fn category_history(&self, recipient: &str) -> Result<Vec<HistoryEntry>>;
}

/// Strategy for guessing a category from a recipient's history.
pub trait CategoryGuesser {
    fn guess(&self, recipient: &str, history: &[HistoryEntry]) -> Option<String>;
}

/// The most recently categorized transaction for the same recipient wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LastWriteWins;

impl CategoryGuesser for LastWriteWins {
    fn guess(&self, recipient: &str, history: &[HistoryEntry]) -> Option<String> {
        infer_category(recipient, history)
    }
}

pub fn infer_category(recipient: &str, history: &[HistoryEntry]) -> Option<String> {
    history
        .iter()
        .filter(|h| h.recipient == recipient && h.category.is_some())
        .max_by_key(|h| h.created_at)
        .and_then(|h| h.category.clone())
}

#[derive(Debug)]
pub struct CategorizeResult {
    pub categorized: usize,
    pub uncategorized: usize,
}

/// Fill in categories for not-yet-categorized transactions. A failed lookup
/// leaves that transaction uncategorized instead of failing the batch.
pub fn categorize_transactions(
    txns: &mut [Transaction],
    lookup: &dyn HistoryLookup,
    guesser: &dyn CategoryGuesser,
) -> CategorizeResult {
    let mut categorized = 0usize;
    let mut uncategorized = 0usize;

    for txn in txns.iter_mut().filter(|t| t.category.is_none()) {
        let guess = match lookup.category_history(&txn.recipient) {
            Ok(history) => guesser.guess(&txn.recipient, &history),
            Err(e) => {
                warn!(recipient = %txn.recipient, "category history unavailable: {e}");
                None
            }
        };
        match guess {
            Some(category) => {
                debug!(code = %txn.code, %category, "inferred category");
                txn.category = Some(category);
                categorized += 1;
            }
            None => uncategorized += 1,
        }
    }

    CategorizeResult {
        categorized,
        uncategorized,
    }
}
