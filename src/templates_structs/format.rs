//! Display formatting for prices and countdowns.

/// Format an amount in major units the Polish way: `1 234,56 zł`.
/// Non-PLN currencies keep their upper-cased ISO code.
pub fn money(amount: f64, currency_code: &str) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();

    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let symbol = match currency_code.to_ascii_lowercase().as_str() {
        "pln" => "zł".to_string(),
        other => other.to_uppercase(),
    };
    format!("{sign}{grouped},{:02} {symbol}", cents % 100)
}

/// `MM:SS` for the block countdown (minutes may exceed 59).
pub fn countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
