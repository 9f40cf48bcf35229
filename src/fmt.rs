/// Format an amount in shillings with thousands separators: Ksh 1,234.56
pub fn money(val: f64) -> String {
    let fixed = format!("{:.2}", val.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if val < 0.0 { "-" } else { "" };
    format!("{sign}Ksh {grouped}.{cents}")
}

/// Share of categorized rows as a whole percentage.
pub fn progress(completed: i64, total: i64) -> String {
    if total <= 0 {
        return "0%".to_string();
    }
    format!("{}%", completed * 100 / total)
}
