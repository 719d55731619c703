//! Currency conversion and formatting.

pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

/// Convert a minor-unit amount (cents) to whole major units, rounding to nearest.
pub fn minor_to_major(minor: f64) -> i64 {
    (minor / MINOR_UNITS_PER_MAJOR).round() as i64
}

/// Format a minor-unit amount as whole dollars with thousands separators,
/// e.g. `2_450_000.0` → `$24,500`.
pub fn format_currency(minor: f64) -> String {
    let major = minor_to_major(minor);
    let digits = major.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if major < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
