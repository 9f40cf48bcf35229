use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::db::{get_import, get_transactions};
use crate::error::Result;
use crate::filter::{select, Filter};
use crate::fmt::money;
use crate::reports::{by_total_desc, summarize, PeriodTotal, Summary};
use crate::settings::load_settings;

fn amount_cell(val: f64) -> Cell {
    Cell::new(money(val)).set_alignment(CellAlignment::Right)
}

fn breakdown(period: &PeriodTotal) -> String {
    period
        .categories
        .iter()
        .map(|c| format!("{} {}", c.category, money(c.amount)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn period_table(header: &str, periods: &[PeriodTotal]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header, "Total", "By category"]);
    for period in periods {
        table.add_row(vec![
            Cell::new(&period.period),
            amount_cell(period.total),
            Cell::new(breakdown(period)),
        ]);
    }
    table
}

fn print_tables(summary: &Summary) {
    let mut categories = Table::new();
    categories.set_header(vec!["Category", "Count", "Total", "Largest"]);
    for cat in by_total_desc(&summary.categories) {
        let largest = cat
            .members
            .first()
            .map(|m| format!("{} {}", m.recipient, money(m.amount)))
            .unwrap_or_default();
        categories.add_row(vec![
            Cell::new(&cat.name),
            Cell::new(cat.count),
            amount_cell(cat.total),
            Cell::new(largest),
        ]);
    }
    categories.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(summary.count),
        amount_cell(summary.total),
        Cell::new(""),
    ]);
    println!("Spending by category\n{categories}\n");

    println!("Daily spending\n{}\n", period_table("Day", &summary.days));
    println!("Monthly spending\n{}\n", period_table("Month", &summary.months));

    let mut recipients = Table::new();
    recipients.set_header(vec!["#", "Recipient", "Payments", "Total"]);
    for (rank, r) in summary.top_recipients.iter().enumerate() {
        recipients.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&r.recipient),
            Cell::new(r.count),
            amount_cell(r.total),
        ]);
    }
    println!("Top recipients\n{recipients}");
}

pub fn run(import_id: i64, filter: Filter, json: bool, top: Option<usize>) -> Result<()> {
    let conn = open_db()?;
    let import = get_import(&conn, import_id)?;
    let txns = select(&get_transactions(&conn, import_id)?, &filter);
    let top = top.unwrap_or_else(|| load_settings().top_recipients);
    let summary = summarize(&txns, top);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}\n", import.name.bold());
    if txns.is_empty() {
        println!("No transactions match.");
        return Ok(());
    }
    print_tables(&summary);
    Ok(())
}
