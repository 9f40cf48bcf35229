use colored::Colorize;

use crate::analysis::{build_prompt, run_analysis, CommandSummarizer};
use crate::cli::open_db;
use crate::db::{get_import, get_transactions, latest_report};
use crate::error::{LedgerError, Result};
use crate::filter::{select, Filter};
use crate::reports::summarize;
use crate::settings::load_settings;

pub fn run(
    import_id: i64,
    filter: Filter,
    prompt_only: bool,
    document: Option<&str>,
    command: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let conn = open_db()?;

    if prompt_only {
        let txns = select(&get_transactions(&conn, import_id)?, &filter);
        println!("{}", build_prompt(&summarize(&txns, settings.top_recipients)));
        return Ok(());
    }

    let command = command.or(settings.summarizer_command).ok_or_else(|| {
        LedgerError::Summarizer(
            "no summarizer configured; set summarizer_command in settings.json or pass --command"
                .to_string(),
        )
    })?;
    let document = document.map(std::fs::read).transpose()?;

    let outcome = run_analysis(
        &conn,
        import_id,
        &filter,
        settings.top_recipients,
        &CommandSummarizer::new(command),
        document.as_deref(),
    )?;

    println!("{}\n", format!("Analysis #{}", outcome.report_id).bold());
    println!("{}", outcome.text);
    Ok(())
}

pub fn show(import_id: i64, document_out: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let import = get_import(&conn, import_id)?;
    let Some(report) = latest_report(&conn, import_id)? else {
        println!("No analysis stored for {}.", import.name);
        return Ok(());
    };

    println!(
        "{}",
        format!(
            "Analysis #{} of import {} \"{}\" ({})",
            report.id, report.import_id, import.name, report.created_at
        )
        .bold()
    );
    println!("\n{}", report.analysis_text);

    match (document_out, report.document.as_deref()) {
        (Some(path), Some(bytes)) => {
            std::fs::write(path, bytes)?;
            println!("\nDocument written to {path}");
        }
        (Some(_), None) => println!("\nNo document stored with this analysis."),
        (None, Some(bytes)) => println!("\nDocument stored ({} bytes); use --document-out to save it.", bytes.len()),
        (None, None) => {}
    }
    Ok(())
}
