//! Number parsing and formatting for display strings.

/// Parse a display string as a number. Both `,` and `.` are accepted as the
/// decimal separator and spaces are ignored. Non-finite values are rejected.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a calculator result: at most 10 fraction digits, trailing zeros
/// trimmed, no grouping. Non-finite values format as `"0"`.
pub fn format_display_value(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let fixed = format!("{:.10}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');

    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Format with thousands grouping and between `min_fraction` and
/// `max_fraction` fraction digits. Returns `None` for non-finite values.
pub fn format_grouped(value: f64, max_fraction: usize, min_fraction: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut fraction = frac_part.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let is_zero = int_part.chars().all(|c| c == '0') && fraction.chars().all(|c| c == '0');

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }

    Some(out)
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
