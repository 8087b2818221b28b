use chrono::{Days, NaiveDate, NaiveTime};

/// Largest magnitude at which every integral `f64` is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// Formats a number without locale-dependent separators and without a
/// forced decimal point for integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Collapses every run of whitespace (line breaks included) into one space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a number format code displays a date: it carries a year or day
/// token outside quoted literals and bracketed sections.
pub fn is_date_format(code: &str) -> bool {
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            'y' | 'Y' | 'd' | 'D' if !in_quote && !in_bracket => return true,
            _ => {}
        }
    }
    false
}

/// Converts a 1900-system serial date to `YYYY-MM-DD`, adding `HH:MM:SS`
/// when the serial has a time part. Returns `None` outside the valid range.
pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let days = serial.trunc() as u64;
    // Serials below 61 precede the fictitious 1900-02-29.
    let epoch = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let date = epoch.checked_add_days(Days::new(days))?;
    let seconds = (serial.fract() * 86_400.0).round() as u32;
    if seconds == 0 || seconds >= 86_400 {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(format!("{} {}", date.format("%Y-%m-%d"), time.format("%H:%M:%S")))
}
