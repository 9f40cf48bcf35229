//! Spending analysis: turns aggregates into a summarization prompt, hands it
//! to an external summarizer and archives the answer with its import.

use std::io::Write;
use std::process::{Command, Stdio};

use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info};

use crate::db::{get_transactions, save_report};
use crate::error::{LedgerError, Result};
use crate::filter::{select, Filter};
use crate::reports::{summarize, Summary};

pub const NO_ANALYSIS: &str = "No analysis available";

/// Currency label used in the prompt.
const CURRENCY: &str = "KSH";

/// Anything that can turn a prompt into prose.
pub trait Summarizer {
    fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Pipes the prompt to a shell command on stdin and reads the answer from
/// stdout.
pub struct CommandSummarizer {
    command: String,
}

impl CommandSummarizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, prompt: &str) -> Result<String> {
        debug!(command = %self.command, "running summarizer");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // Commands that never read stdin may already have exited.
            if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LedgerError::Summarizer(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn amount_line(label: &str, amount: f64) -> String {
    format!("{label}: {amount:.2} {CURRENCY}")
}

pub fn build_prompt(summary: &Summary) -> String {
    let categories: Vec<String> = summary
        .categories
        .iter()
        .map(|c| amount_line(&c.name, c.total))
        .collect();
    let months: Vec<String> = summary
        .months
        .iter()
        .map(|m| amount_line(&m.period, m.total))
        .collect();
    let recipients: Vec<String> = summary
        .top_recipients
        .iter()
        .map(|r| amount_line(&r.recipient, r.total))
        .collect();

    format!(
        "Please analyze this financial data and provide insights and recommendations:

Transaction Summary:
- Total Spent: {total:.2} {CURRENCY}
- Number of Transactions: {count}

Category Breakdown:
{categories}

Monthly Spending:
{months}

Top Recipients:
{recipients}

Please provide:
1. Key spending patterns and trends
2. Areas where spending could be optimized
3. Specific recommendations for better financial management
4. Any concerning patterns that should be addressed
Keep the analysis concise and actionable.",
        total = summary.total,
        count = summary.count,
        categories = categories.join("\n"),
        months = months.join("\n"),
        recipients = recipients.join("\n"),
    )
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Pull the prose out of a summarizer response. Chat-completion JSON yields
/// `choices[0].message.content`; anything else is taken as plain text.
pub fn extract_analysis_text(raw: &str) -> String {
    let text = match serde_json::from_str::<Completion>(raw) {
        Ok(completion) => completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default(),
        Err(_) => raw.to_string(),
    };
    let text = text.trim();
    if text.is_empty() {
        NO_ANALYSIS.to_string()
    } else {
        text.to_string()
    }
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report_id: i64,
    pub text: String,
}

/// Summarize an import's (filtered) transactions, ask the summarizer for an
/// analysis and store it, optionally alongside a rendered document.
pub fn run_analysis(
    conn: &Connection,
    import_id: i64,
    filter: &Filter,
    top_limit: usize,
    summarizer: &dyn Summarizer,
    document: Option<&[u8]>,
) -> Result<AnalysisOutcome> {
    let txns = select(&get_transactions(conn, import_id)?, filter);
    if txns.is_empty() {
        return Err(LedgerError::NoTransactions);
    }
    let prompt = build_prompt(&summarize(&txns, top_limit));
    let text = extract_analysis_text(&summarizer.summarize(&prompt)?);
    let report_id = save_report(conn, import_id, &text, document)?;
    info!(import_id, report_id, "saved analysis");
    Ok(AnalysisOutcome { report_id, text })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::db::tests::{test_db, txn};
    use crate::db::{insert_import, latest_report};
    use crate::reports::TOP_RECIPIENTS;

    struct Canned {
        reply: String,
        seen: RefCell<Option<String>>,
    }

    impl Summarizer for Canned {
        fn summarize(&self, prompt: &str) -> Result<String> {
            *self.seen.borrow_mut() = Some(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct Failing;

    impl Summarizer for Failing {
        fn summarize(&self, _prompt: &str) -> Result<String> {
            Err(LedgerError::Summarizer("service down".to_string()))
        }
    }

    #[test]
    fn test_build_prompt_embeds_aggregates() {
        let txns = vec![
            txn("A", "Jane", 10.0, Some("Food")),
            txn("B", "Joe", 5.0, Some("Food")),
            txn("C", "Jane", 3.0, None),
        ];
        let prompt = build_prompt(&summarize(&txns, TOP_RECIPIENTS));
        assert!(prompt.contains("- Total Spent: 18.00 KSH"));
        assert!(prompt.contains("- Number of Transactions: 3"));
        assert!(prompt.contains("Food: 15.00 KSH\nUncategorized: 3.00 KSH"));
        assert!(prompt.contains("Monthly Spending:\n2024-03: 18.00 KSH"));
        assert!(prompt.contains("Top Recipients:\nJane: 13.00 KSH\nJoe: 5.00 KSH"));
        assert!(prompt.ends_with("Keep the analysis concise and actionable."));
    }

    #[test]
    fn test_extract_analysis_text_from_completion() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Spend less on taxis.\n"}}]}"#;
        assert_eq!(extract_analysis_text(raw), "Spend less on taxis.");
    }

    #[test]
    fn test_extract_analysis_text_plain_and_empty() {
        assert_eq!(extract_analysis_text("Plain answer"), "Plain answer");
        assert_eq!(extract_analysis_text("   "), NO_ANALYSIS);
        assert_eq!(extract_analysis_text(r#"{"choices":[]}"#), NO_ANALYSIS);
    }

    #[test]
    fn test_run_analysis_stores_report() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(&conn, "x", &[txn("A", "Jane", 10.0, None)]).unwrap();
        let summarizer = Canned {
            reply: "Looks fine.".to_string(),
            seen: RefCell::new(None),
        };
        let outcome = run_analysis(&conn, import_id, &Filter::default(), TOP_RECIPIENTS, &summarizer, None).unwrap();
        assert_eq!(outcome.text, "Looks fine.");
        assert!(summarizer.seen.borrow().as_deref().unwrap().contains("Jane: 10.00 KSH"));
        let stored = latest_report(&conn, import_id).unwrap().unwrap();
        assert_eq!(stored.id, outcome.report_id);
        assert_eq!(stored.analysis_text, "Looks fine.");
    }

    #[test]
    fn test_run_analysis_summarizer_failure_saves_nothing() {
        let (_dir, conn) = test_db();
        let import_id = insert_import(&conn, "x", &[txn("A", "Jane", 10.0, None)]).unwrap();
        let err = run_analysis(&conn, import_id, &Filter::default(), TOP_RECIPIENTS, &Failing, None).unwrap_err();
        assert!(matches!(err, LedgerError::Summarizer(_)));
        assert!(latest_report(&conn, import_id).unwrap().is_none());
    }

    #[test]
    fn test_command_summarizer_reads_stdout() {
        let summarizer = CommandSummarizer::new("tr a-z A-Z");
        assert_eq!(summarizer.summarize("abc").unwrap(), "ABC");
        let failing = CommandSummarizer::new("exit 3");
        assert!(matches!(failing.summarize("abc"), Err(LedgerError::Summarizer(_))));
    }
}
