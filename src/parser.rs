use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use tracing::trace;

use crate::models::Transaction;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip thousands separators and parse. `None` for anything that is not a
/// finite, non-negative number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', "").trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Convert a 12-hour clock hour to 24-hour form.
///
/// PM adds 12 unless the hour is already 12; 12 AM is midnight. Every other
/// combination passes through unchanged.
pub fn to_24_hour(hour: u32, meridiem: &str) -> u32 {
    let pm = meridiem.eq_ignore_ascii_case("PM");
    match (pm, hour) {
        (true, h) if h != 12 => h + 12,
        (false, 12) => 0,
        (_, h) => h,
    }
}

/// Build a timestamp from `D/M/YY` and `H:MM AM|PM` parts. Two-digit years
/// land in the 2000s.
pub fn build_datetime(
    day: &str,
    month: &str,
    year: &str,
    hour: &str,
    minute: &str,
    meridiem: &str,
) -> Option<NaiveDateTime> {
    let year: i32 = year.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(2000 + year, month.parse().ok()?, day.parse().ok()?)?;
    let hour = to_24_hour(hour.parse().ok()?, meridiem);
    let time = NaiveTime::from_hms_opt(hour, minute.parse().ok()?, 0)?;
    Some(date.and_time(time))
}

// ---------------------------------------------------------------------------
// Line formats (one variant per provider template)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineFormat {
    Mpesa,
}

impl LineFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Mpesa => "mpesa",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mpesa => "M-Pesa transfer notification",
        }
    }

    pub fn currency_marker(&self) -> &'static str {
        match self {
            Self::Mpesa => "Ksh",
        }
    }

    /// Cheap pre-check before running the full extraction.
    pub fn detect(&self, line: &str) -> bool {
        match self {
            Self::Mpesa => line.contains(self.currency_marker()) && mpesa_recipient_re().is_match(line),
        }
    }

    pub fn parse(&self, line: &str) -> Option<Transaction> {
        match self {
            Self::Mpesa => parse_mpesa(line),
        }
    }
}

pub const ALL_FORMATS: &[LineFormat] = &[LineFormat::Mpesa];

pub fn get_by_key(key: &str) -> Option<LineFormat> {
    ALL_FORMATS.iter().find(|f| f.key() == key).copied()
}

// ---------------------------------------------------------------------------
// Message + batch parsing
// ---------------------------------------------------------------------------

/// Parse one trimmed line with whichever known format claims it.
pub fn parse_line(line: &str) -> Option<Transaction> {
    ALL_FORMATS
        .iter()
        .filter(|f| f.detect(line))
        .find_map(|f| f.parse(line))
}

/// Parse every non-blank line of `text`, keeping matches in source order.
pub fn parse_batch(text: &str) -> Vec<Transaction> {
    collect_lines(text, parse_line)
}

/// Like [`parse_batch`] but pinned to a single format.
pub fn parse_batch_with(format: LineFormat, text: &str) -> Vec<Transaction> {
    collect_lines(text, |line| format.parse(line))
}

fn collect_lines(text: &str, parse: impl Fn(&str) -> Option<Transaction>) -> Vec<Transaction> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse(line);
            if parsed.is_none() {
                trace!(line, "no transaction in line");
            }
            parsed
        })
        .collect()
}

// ---------------------------------------------------------------------------
// M-Pesa
// ---------------------------------------------------------------------------

fn mpesa_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9]+").expect("invalid code regex"))
}

fn mpesa_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Ksh\s?(\d[\d,]*(?:\.\d+)?)").expect("invalid amount regex"))
}

fn mpesa_recipient_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:sent|paid) to\s+(.+?)(?:\s+on\s|\.|$)").expect("invalid recipient regex")
    })
}

fn mpesa_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bon\s+(\d{1,2})/(\d{1,2})/(\d{2})\b").expect("invalid date regex")
    })
}

fn mpesa_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bat\s+(\d{1,2}):(\d{2})\s*([AaPp][Mm])\b").expect("invalid time regex")
    })
}

fn parse_mpesa(line: &str) -> Option<Transaction> {
    let code = mpesa_code_re().find(line)?.as_str().to_string();

    let amount = parse_amount(&mpesa_amount_re().captures(line)?[1])?;

    let recipient = mpesa_recipient_re().captures(line)?[1].trim().to_string();
    if recipient.is_empty() {
        return None;
    }

    let date = mpesa_date_re().captures(line)?;
    let time = mpesa_time_re().captures(line)?;
    let datetime = build_datetime(&date[1], &date[2], &date[3], &time[1], &time[2], &time[3])?;

    Some(Transaction::parsed(code, recipient, amount, datetime))
}
