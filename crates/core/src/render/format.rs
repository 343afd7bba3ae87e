//! Number and label formatting shared by every section.
//!
//! Absent or non-finite input always renders as [`NOT_AVAILABLE`], never as a zero.

pub const NOT_AVAILABLE: &str = "N/A";
pub const MISSING_TEXT: &str = "-";

/// `1234.5` → `1,234.50`.
pub fn price(v: Option<f64>) -> String {
    match finite(v) {
        Some(v) => grouped(v, 2),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `2.5` → `+2.50%`, `-1.234` → `-1.23%`. The sign is always written.
pub fn percent(v: Option<f64>) -> String {
    match finite(v) {
        Some(v) => format!("{}%", signed(v)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Fixed decimals without grouping, e.g. ratios and scores.
pub fn decimal(v: Option<f64>, places: usize) -> String {
    match finite(v) {
        Some(v) => format!("{:.*}", places, normalize_zero(v, places)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Whole counts with thousands separators (option volumes).
pub fn count(v: Option<f64>) -> String {
    match finite(v) {
        Some(v) => grouped(v, 0),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn text(v: Option<&str>) -> String {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(MISSING_TEXT)
        .to_string()
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn signed(v: f64) -> String {
    let v = normalize_zero(v, 2);
    if v < 0.0 {
        format!("-{:.2}", -v)
    } else {
        format!("+{v:.2}")
    }
}

/// Values that round to zero at `places` lose their sign, so `-0.001` never prints `-0.00`.
fn normalize_zero(v: f64, places: usize) -> f64 {
    let scale = 10f64.powi(places as i32);
    if (v * scale).round() == 0.0 {
        0.0
    } else {
        v
    }
}

fn grouped(v: f64, places: usize) -> String {
    let v = normalize_zero(v, places);
    let fixed = format!("{:.*}", places, v.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if v < 0.0 {
        out.push('-');
    }
    for (idx, ch) in int_part.chars().enumerate() {
        if idx != 0 && (int_part.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
