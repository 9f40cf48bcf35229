use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::Transaction;

/// How many recipients the ranked list keeps.
pub const TOP_RECIPIENTS: usize = 10;

// ---------------------------------------------------------------------------
// Grouping helper
// ---------------------------------------------------------------------------

/// Sums keyed amounts, remembering the order in which keys first appear.
struct Ledger<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T: Default> Ledger<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

fn sum_amounts(txns: &[&Transaction]) -> f64 {
    txns.iter().map(|t| t.amount).sum()
}

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientAmount {
    pub recipient: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
    /// Individual payments in this category, largest first.
    pub members: Vec<RecipientAmount>,
}

/// Totals per category in first-encounter order. A missing category counts
/// as "Uncategorized".
pub fn category_totals(txns: &[Transaction]) -> Vec<CategoryTotal> {
    let mut ledger: Ledger<Vec<&Transaction>> = Ledger::new();
    for txn in txns {
        ledger.entry(txn.category_label()).push(txn);
    }

    ledger
        .into_entries()
        .into_iter()
        .map(|(name, members)| {
            let mut payments: Vec<RecipientAmount> = members
                .iter()
                .map(|t| RecipientAmount {
                    recipient: t.recipient.clone(),
                    amount: t.amount,
                })
                .collect();
            payments.sort_by(|a, b| b.amount.total_cmp(&a.amount));
            CategoryTotal {
                name,
                total: sum_amounts(&members),
                count: members.len(),
                members: payments,
            }
        })
        .collect()
}

/// Display order for category totals: largest first, ties in encounter order.
pub fn by_total_desc(categories: &[CategoryTotal]) -> Vec<&CategoryTotal> {
    let mut sorted: Vec<&CategoryTotal> = categories.iter().collect();
    sorted.sort_by(|a, b| b.total.total_cmp(&a.total));
    sorted
}

// ---------------------------------------------------------------------------
// Timeline (per day / per month)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotal {
    /// `YYYY-MM-DD` for days, `YYYY-MM` for months.
    pub period: String,
    pub total: f64,
    /// Category breakdown within the period, largest first.
    pub categories: Vec<CategoryAmount>,
}

fn period_totals(txns: &[Transaction], fmt: &str) -> Vec<PeriodTotal> {
    // Zero-padded date keys sort lexically in calendar order.
    // Period totals accumulate per transaction in input order, like the grand total.
    let mut periods: BTreeMap<String, (f64, Ledger<f64>)> = BTreeMap::new();
    for txn in txns {
        let key = txn.datetime.format(fmt).to_string();
        let (total, ledger) = periods.entry(key).or_insert_with(|| (0.0, Ledger::new()));
        *total += txn.amount;
        *ledger.entry(txn.category_label()) += txn.amount;
    }

    periods
        .into_iter()
        .map(|(period, (total, ledger))| {
            let mut categories: Vec<CategoryAmount> = ledger
                .into_entries()
                .into_iter()
                .map(|(category, amount)| CategoryAmount { category, amount })
                .collect();
            categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));
            PeriodTotal {
                period,
                total,
                categories,
            }
        })
        .collect()
}

/// Per-day totals, earliest day first.
pub fn daily_totals(txns: &[Transaction]) -> Vec<PeriodTotal> {
    period_totals(txns, "%Y-%m-%d")
}

/// Per-month totals, earliest month first.
pub fn monthly_totals(txns: &[Transaction]) -> Vec<PeriodTotal> {
    period_totals(txns, "%Y-%m")
}

// ---------------------------------------------------------------------------
// Top recipients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientTotal {
    pub recipient: String,
    pub total: f64,
    pub count: usize,
}

/// Recipients ranked by total spend, keeping at most `limit`. Ties keep the
/// order in which recipients were first seen.
pub fn top_recipients(txns: &[Transaction], limit: usize) -> Vec<RecipientTotal> {
    let mut ledger: Ledger<(f64, usize)> = Ledger::new();
    for txn in txns {
        let slot = ledger.entry(&txn.recipient);
        slot.0 += txn.amount;
        slot.1 += 1;
    }

    let mut ranked: Vec<RecipientTotal> = ledger
        .into_entries()
        .into_iter()
        .map(|(recipient, (total, count))| RecipientTotal {
            recipient,
            total,
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(limit);
    ranked
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub categories: Vec<CategoryTotal>,
    pub days: Vec<PeriodTotal>,
    pub months: Vec<PeriodTotal>,
    pub top_recipients: Vec<RecipientTotal>,
    pub total: f64,
    pub count: usize,
}

pub fn summarize(txns: &[Transaction], top_limit: usize) -> Summary {
    Summary {
        categories: category_totals(txns),
        days: daily_totals(txns),
        months: monthly_totals(txns),
        top_recipients: top_recipients(txns, top_limit),
        total: txns.iter().map(|t| t.amount).sum(),
        count: txns.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(recipient: &str, amount: f64, category: Option<&str>, date: (i32, u32, u32)) -> Transaction {
        let datetime = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let mut t = Transaction::parsed("C1".to_string(), recipient.to_string(), amount, datetime);
        t.category = category.map(str::to_string);
        t
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn("Jane", 10.0, Some("Food"), (2024, 3, 5)),
            txn("Mama Mboga", 5.0, Some("Food"), (2024, 3, 5)),
            txn("KPLC", 3.0, None, (2024, 2, 28)),
            txn("Jane", 40.0, Some("Transport"), (2024, 4, 1)),
        ]
    }

    #[test]
    fn test_category_totals_example() {
        let txns = vec![
            txn("A", 10.0, Some("Food"), (2024, 1, 1)),
            txn("B", 5.0, Some("Food"), (2024, 1, 1)),
            txn("C", 3.0, None, (2024, 1, 1)),
        ];
        let summary = summarize(&txns, TOP_RECIPIENTS);
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].name, "Food");
        assert_eq!(summary.categories[0].total, 15.0);
        assert_eq!(summary.categories[0].count, 2);
        assert_eq!(summary.categories[1].name, "Uncategorized");
        assert_eq!(summary.categories[1].total, 3.0);
        assert_eq!(summary.total, 18.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_category_members_sorted_desc() {
        let totals = category_totals(&sample());
        let food = totals.iter().find(|c| c.name == "Food").unwrap();
        assert_eq!(food.members[0].recipient, "Jane");
        assert_eq!(food.members[1].recipient, "Mama Mboga");
    }

    #[test]
    fn test_by_total_desc() {
        let totals = category_totals(&sample());
        let sorted = by_total_desc(&totals);
        let names: Vec<&str> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Transport", "Food", "Uncategorized"]);
    }

    #[test]
    fn test_daily_totals_sorted_ascending_with_breakdown() {
        let mut txns = sample();
        txns.push(txn("Uber", 20.0, Some("Transport"), (2024, 3, 5)));
        let days = daily_totals(&txns);
        let labels: Vec<&str> = days.iter().map(|d| d.period.as_str()).collect();
        assert_eq!(labels, vec!["2024-02-28", "2024-03-05", "2024-04-01"]);
        let march = &days[1];
        assert_eq!(march.total, 35.0);
        assert_eq!(march.categories[0].category, "Transport");
        assert_eq!(march.categories[0].amount, 20.0);
        assert_eq!(march.categories[1].category, "Food");
        assert_eq!(march.categories[1].amount, 15.0);
    }

    #[test]
    fn test_monthly_totals() {
        let months = monthly_totals(&sample());
        let labels: Vec<(&str, f64)> = months.iter().map(|m| (m.period.as_str(), m.total)).collect();
        assert_eq!(labels, vec![("2024-02", 3.0), ("2024-03", 15.0), ("2024-04", 40.0)]);
    }

    #[test]
    fn test_totals_agree() {
        let summary = summarize(&sample(), TOP_RECIPIENTS);
        let by_category: f64 = summary.categories.iter().map(|c| c.total).sum();
        let by_day: f64 = summary.days.iter().map(|d| d.total).sum();
        let by_month: f64 = summary.months.iter().map(|m| m.total).sum();
        assert_eq!(by_category, summary.total);
        assert_eq!(by_day, summary.total);
        assert_eq!(by_month, summary.total);
        assert_eq!(summary.total, 58.0);
    }

    #[test]
    fn test_period_totals_match_grand_total_with_fractions() {
        let txns = vec![
            txn("Kiosk", 0.1, Some("A"), (2024, 3, 5)),
            txn("Matatu", 0.2, Some("B"), (2024, 3, 5)),
            txn("Pharmacy", 0.3, Some("C"), (2024, 3, 5)),
        ];
        let summary = summarize(&txns, TOP_RECIPIENTS);
        let by_category: f64 = summary.categories.iter().map(|c| c.total).sum();
        assert_eq!(summary.days.len(), 1);
        assert_eq!(summary.days[0].total, summary.total);
        assert_eq!(summary.months[0].total, summary.total);
        assert_eq!(by_category, summary.total);
        // breakdown is still largest first
        assert_eq!(summary.days[0].categories[0].category, "C");
    }

    #[test]
    fn test_top_recipients_ranked_and_truncated() {
        let mut txns = Vec::new();
        for i in 0..15 {
            txns.push(txn(&format!("R{i}"), i as f64, None, (2024, 1, 1)));
        }
        let top = top_recipients(&txns, TOP_RECIPIENTS);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].recipient, "R14");
        assert!(top.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn test_top_recipients_sums_and_keeps_tie_order() {
        let txns = vec![
            txn("B", 5.0, None, (2024, 1, 1)),
            txn("A", 5.0, None, (2024, 1, 1)),
            txn("C", 2.0, None, (2024, 1, 1)),
            txn("C", 8.0, None, (2024, 1, 2)),
        ];
        let top = top_recipients(&txns, TOP_RECIPIENTS);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].recipient, "C");
        assert_eq!(top[0].total, 10.0);
        assert_eq!(top[0].count, 2);
        assert_eq!(top[1].recipient, "B");
        assert_eq!(top[2].recipient, "A");
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[], TOP_RECIPIENTS);
        assert!(summary.categories.is_empty());
        assert!(summary.days.is_empty());
        assert!(summary.top_recipients.is_empty());
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.count, 0);
    }
}
