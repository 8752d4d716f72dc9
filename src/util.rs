// Utility helpers for value normalization and basic statistics.
//
// This module centralizes all the "dirty" cell handling (null-like tokens,
// full-width digits, unit suffixes, durations, loose dates) so the metric
// code can assume clean, typed values.
use crate::types::Value;
use chrono::{DateTime, NaiveDate};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RE_ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("valid date regex"));

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%d.%m.%Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y", "%Y%m%d",
];

/// Target shape for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    /// Seconds; accepts plain numbers and `mm:ss` / `hh:mm:ss`.
    Duration,
    Date,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Null,
    Number(f64),
    /// `YYYY-MM-DD`
    Date(String),
    Text(String),
}

impl NormalizedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            NormalizedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            NormalizedValue::Date(s) | NormalizedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NormalizedValue::Null)
    }
}

impl From<NormalizedValue> for Value {
    fn from(v: NormalizedValue) -> Self {
        match v {
            NormalizedValue::Null => Value::Null,
            NormalizedValue::Number(n) => Value::Number(n),
            NormalizedValue::Date(s) | NormalizedValue::Text(s) => Value::Text(s),
        }
    }
}

/// Normalize one raw cell into the canonical form for `kind`.
///
/// Never fails: anything absent or unparseable becomes
/// [`NormalizedValue::Null`]. Normalizing an already normalized value
/// returns it unchanged.
pub fn normalize(value: &Value, kind: FieldKind) -> NormalizedValue {
    let out = match kind {
        FieldKind::Number => parse_number(value).map(NormalizedValue::Number),
        FieldKind::Duration => parse_seconds(value).map(NormalizedValue::Number),
        FieldKind::Date => parse_date_iso(value).map(NormalizedValue::Date),
        FieldKind::Text => parse_text(value).map(NormalizedValue::Text),
    };
    out.unwrap_or(NormalizedValue::Null)
}

/// Whether a string is one of the tokens exports use for "no value".
pub fn is_null_like(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "" | "null" | "n/a" | "na"
    )
}

/// Convert full-width digits (`０`–`９`) to ASCII.
pub fn to_ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// The cell as trimmed text, or `None` for null, null-like and empty input.
fn cell_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::Null => return None,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if n.is_finite() => format_plain(*n),
        Value::Number(_) => return None,
        Value::Text(s) => s.trim().to_string(),
    };
    if is_null_like(&s) {
        None
    } else {
        Some(s)
    }
}

/// Parse a value into `f64` while being forgiving about formatting issues
/// that are common in call-center exports.
///
/// - Converts full-width digits.
/// - Strips `%`, the unit words `seconds`/`sec`/`s` and thousands separators.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => return n.is_finite().then_some(*n),
        Value::Bool(_) => return None,
        _ => {}
    }
    let raw = to_ascii_digits(&cell_text(value)?).to_lowercase();
    let cleaned = raw
        .replace('%', "")
        .replace("seconds", "")
        .replace("second", "")
        .replace("sec", "")
        .replace('s', "")
        .replace(',', "");
    let n = cleaned.trim().parse::<f64>().ok()?;
    n.is_finite().then_some(n)
}

/// Parse a handle-time cell into seconds.
///
/// Strings with `:` are read as `mm:ss` or `hh:mm:ss`; any empty or
/// non-numeric component rejects the whole value.
pub fn parse_seconds(value: &Value) -> Option<f64> {
    let Value::Text(s) = value else {
        return parse_number(value);
    };
    let s = to_ascii_digits(s.trim());
    if !s.contains(':') {
        return parse_number(value);
    }
    let parts: Option<Vec<f64>> = s
        .split(':')
        .map(|p| {
            let p = p.trim();
            if p.is_empty() {
                None
            } else {
                p.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        })
        .collect();
    match parts?.as_slice() {
        [mm, ss] => Some(mm * 60.0 + ss),
        [hh, mm, ss] => Some(hh * 3600.0 + mm * 60.0 + ss),
        _ => None,
    }
}

/// Parse a date cell into `YYYY-MM-DD`.
///
/// A leading `YYYY-M-D` (or `YYYY/M/D`) is zero-padded and returned as-is;
/// otherwise a handful of common export formats are tried.
pub fn parse_date_iso(value: &Value) -> Option<String> {
    let Value::Text(_) = value else {
        return None;
    };
    let s = to_ascii_digits(&cell_text(value)?);
    if let Some(caps) = RE_ISO_PREFIX.captures(&s) {
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return Some(format!("{}-{:02}-{:02}", &caps[1], month, day));
    }
    parse_date_loose(&s).map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date_loose(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_text(value: &Value) -> Option<String> {
    cell_text(value).filter(|s| !s.is_empty())
}

/// Read a boolean-like flag (`true/yes/y/1/within/met`, `false/no/n/0/out/miss`).
pub fn parse_bool_like(value: &Value) -> Option<bool> {
    if let Value::Bool(b) = value {
        return Some(*b);
    }
    let s = cell_text(value)?.to_lowercase();
    match s.as_str() {
        "true" | "t" | "yes" | "y" | "1" | "within" | "met" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "out" | "miss" => Some(false),
        _ => None,
    }
}

/// Render a number without a trailing `.0` when it is integral.
fn format_plain(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Percentage `part / whole * 100`, rounded to one decimal; `None` when
/// `whole` is zero.
pub fn percent(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(round1(part as f64 / whole as f64 * 100.0))
}

/// Median of an ascending-sorted slice.
pub fn median_sorted(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

/// Rank-based percentile of an ascending-sorted slice: the element at
/// `ceil(p * n) - 1`, clamped into range. No interpolation.
pub fn percentile_rank(v: &[f64], p: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let idx = (p * v.len() as f64).ceil() as i64 - 1;
    let idx = idx.clamp(0, v.len() as i64 - 1) as usize;
    Some(v[idx])
}

/// Linear-interpolated quantile `q` (clamped to `[0, 1]`) of the finite
/// values in `values`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut xs: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);
    let q = q.clamp(0.0, 1.0);
    let pos = (xs.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match xs.get(base + 1) {
        Some(next) => Some(xs[base] + rest * (next - xs[base])),
        None => Some(xs[base]),
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// `"-"` for missing values, otherwise `format_number` plus a unit suffix.
pub fn format_opt(n: Option<f64>, decimals: usize, suffix: &str) -> String {
    match n {
        Some(v) => format!("{}{}", format_number(v, decimals), suffix),
        None => "-".to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_null_like_tokens() {
        for s in ["", "  ", "NULL", "null", "N/A", "n/a", "na", "NA"] {
            assert_eq!(normalize(&text(s), FieldKind::Number), NormalizedValue::Null, "{s:?}");
            assert_eq!(normalize(&text(s), FieldKind::Text), NormalizedValue::Null, "{s:?}");
        }
        assert_eq!(normalize(&Value::Null, FieldKind::Date), NormalizedValue::Null);
    }

    #[test]
    fn test_parse_number_units_and_separators() {
        assert_eq!(parse_number(&text("85%")), Some(85.0));
        assert_eq!(parse_number(&text("300 sec")), Some(300.0));
        assert_eq!(parse_number(&text("300 seconds")), Some(300.0));
        assert_eq!(parse_number(&text("45s")), Some(45.0));
        assert_eq!(parse_number(&text("1,234.5")), Some(1234.5));
        assert_eq!(parse_number(&text("abc")), None);
        assert_eq!(parse_number(&Value::Bool(true)), None);
        assert_eq!(parse_number(&Value::Number(f64::NAN)), None);
    }

    #[test]
    fn test_full_width_digits() {
        assert_eq!(to_ascii_digits("３００"), "300");
        assert_eq!(parse_number(&text("３００")), Some(300.0));
        assert_eq!(parse_seconds(&text("０５:００")), Some(300.0));
    }

    #[test]
    fn test_parse_seconds_durations() {
        assert_eq!(parse_seconds(&text("05:30")), Some(330.0));
        assert_eq!(parse_seconds(&text("1:02:03")), Some(3723.0));
        assert_eq!(parse_seconds(&text("5:xx")), None);
        assert_eq!(parse_seconds(&text("5:")), None);
        assert_eq!(parse_seconds(&text("1:2:3:4")), None);
        assert_eq!(parse_seconds(&Value::Number(420.0)), Some(420.0));
        assert_eq!(parse_seconds(&text("420")), Some(420.0));
    }

    #[test]
    fn test_negative_numbers_survive_normalization() {
        assert_eq!(normalize(&text("-5"), FieldKind::Duration), NormalizedValue::Number(-5.0));
    }

    #[test]
    fn test_parse_date_iso_prefix_is_padded() {
        assert_eq!(parse_date_iso(&text("2024-1-5")), Some("2024-01-05".into()));
        assert_eq!(parse_date_iso(&text("2024/12/31 10:00")), Some("2024-12-31".into()));
        assert_eq!(parse_date_iso(&text("2024-03-07T09:15:00")), Some("2024-03-07".into()));
    }

    #[test]
    fn test_parse_date_loose_formats() {
        assert_eq!(parse_date_iso(&text("03/07/2024")), Some("2024-03-07".into()));
        assert_eq!(parse_date_iso(&text("Mar 7, 2024")), Some("2024-03-07".into()));
        assert_eq!(parse_date_iso(&text("7 Mar 2024")), Some("2024-03-07".into()));
        assert_eq!(parse_date_iso(&text("not a date")), None);
        assert_eq!(parse_date_iso(&Value::Number(20240307.0)), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let cases = [
            (text(" 85% "), FieldKind::Number),
            (text("3,000"), FieldKind::Number),
            (text("12:30"), FieldKind::Duration),
            (Value::Number(7.25), FieldKind::Duration),
            (text("2024-2-9"), FieldKind::Date),
            (text("Feb 9, 2024"), FieldKind::Date),
            (text("  Akari "), FieldKind::Text),
            (Value::Number(1023.0), FieldKind::Text),
            (text("N/A"), FieldKind::Text),
            (text("garbage"), FieldKind::Number),
        ];
        for (raw, kind) in cases {
            let once = normalize(&raw, kind);
            let twice = normalize(&Value::from(once.clone()), kind);
            assert_eq!(once, twice, "{raw:?} as {kind:?}");
        }
    }

    #[test]
    fn test_parse_bool_like() {
        assert_eq!(parse_bool_like(&text("Yes")), Some(true));
        assert_eq!(parse_bool_like(&text("within")), Some(true));
        assert_eq!(parse_bool_like(&text("MISS")), Some(false));
        assert_eq!(parse_bool_like(&Value::Number(0.0)), Some(false));
        assert_eq!(parse_bool_like(&Value::Bool(true)), Some(true));
        assert_eq!(parse_bool_like(&text("maybe")), None);
        assert_eq!(parse_bool_like(&Value::Null), None);
    }

    #[test]
    fn test_median_and_rank_percentile() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(median_sorted(&v), Some(2.5));
        assert_eq!(median_sorted(&[5.0]), Some(5.0));
        assert_eq!(median_sorted(&[]), None);
        let hundred: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile_rank(&hundred, 0.9), Some(90.0));
        assert_eq!(percentile_rank(&[7.0], 0.9), Some(7.0));
        assert_eq!(percentile_rank(&[], 0.9), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&v, 0.0), Some(10.0));
        assert_eq!(quantile(&v, 1.0), Some(40.0));
        // pos = 3 * 0.5 = 1.5
        assert_eq!(quantile(&v, 0.5), Some(25.0));
        assert_eq!(quantile(&[40.0, 10.0], 0.25), Some(17.5));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_round1_and_percent() {
        assert_eq!(round1(74.96), 75.0);
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(percent(1, 3), Some(33.3));
        assert_eq!(percent(0, 0), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(300.0, 0), "300");
        assert_eq!(format_opt(None, 1, "%"), "-");
        assert_eq!(format_opt(Some(85.0), 1, "%"), "85.0%");
    }
}
