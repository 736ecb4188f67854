//! Loose input coercion shared by the resources.
//!
//! Request bodies come from browser forms and spreadsheet exports, so scalar
//! fields may arrive as strings, numbers or booleans.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::store::StoreError;

/// Trimmed text of a scalar; `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `deserialize_with` helper accepting any scalar as trimmed text.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

/// `deserialize_with` helper for string lists given either as a JSON array
/// or as text holding a JSON array.
pub fn opt_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(string_list))
}

/// Non-empty trimmed strings of an array, or of a JSON array inside a string.
pub fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(list_from_cell(s)),
        _ => None,
    }
}

/// Reads a stored list cell: a JSON array, or a single bare value.
pub fn list_from_cell(cell: &str) -> Vec<String> {
    let raw = cell.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Array(_)) => string_list(&value).unwrap_or_default(),
        _ => vec![raw.to_string()],
    }
}

pub fn list_to_cell(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Parses a number, ignoring thousands separators and currency symbols.
/// Anything unparseable becomes `fallback`.
pub fn to_number(text: &str, fallback: f64) -> f64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return fallback;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(fallback)
}

/// Cell text for a number; whole numbers are written without a fraction.
pub fn number_cell(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Today's date as `YYYY-MM-DD` (UTC).
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds of an RFC 3339 timestamp or `YYYY-MM-DD` date; 0 when
/// the text is neither.
pub fn date_ms(text: &str) -> i64 {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return ts.timestamp_millis();
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Closed set of status values stored as text.
pub trait StatusSet: Sized + Copy + Default + 'static {
    const FIELD: &'static str;
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.iter().copied().find(|s| s.as_str() == text)
    }

    /// Stored values outside the set read as the default.
    fn from_stored(text: &str) -> Self {
        Self::parse(text).unwrap_or_default()
    }

    /// Caller-supplied value; must be one of the set.
    fn from_input(text: &str) -> Result<Self, StoreError> {
        Self::parse(text).ok_or_else(|| {
            let allowed: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
            StoreError::invalid(Self::FIELD, format!("must be one of {}", allowed.join(", ")))
        })
    }

    /// Like [`StatusSet::from_input`], with an absent or blank value meaning the default.
    fn from_optional_input(text: Option<&str>) -> Result<Self, StoreError> {
        match text.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(text) => Self::from_input(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_are_coerced() {
        assert_eq!(to_number("50000", 0.0), 50000.0);
        assert_eq!(to_number(" 50,000 đ", 0.0), 50000.0);
        assert_eq!(to_number("12.5", 0.0), 12.5);
        assert_eq!(to_number("abc", 7.0), 7.0);
        assert_eq!(to_number("", 0.0), 0.0);
        assert_eq!(number_cell(50000.0), "50000");
        assert_eq!(number_cell(12.5), "12.5");
    }

    #[test]
    fn lists_accept_arrays_and_json_text() {
        assert_eq!(string_list(&json!(["a", " ", "b "])), Some(vec!["a".into(), "b".into()]));
        assert_eq!(string_list(&json!("[\"x\"]")), Some(vec!["x".into()]));
        assert_eq!(string_list(&json!(3)), None);
        assert_eq!(list_from_cell("http://img"), vec!["http://img".to_string()]);
        assert!(list_from_cell("").is_empty());
    }

    #[test]
    fn dates_sort_by_epoch() {
        assert!(date_ms("2024-05-02") > date_ms("2024-05-01"));
        assert!(date_ms("2024-05-01T10:00:00.000Z") > date_ms("2024-05-01"));
        assert_eq!(date_ms("soon"), 0);
    }

    #[test]
    fn scalars_become_text() {
        assert_eq!(scalar_text(&json!(" hi ")), Some("hi".into()));
        assert_eq!(scalar_text(&json!(12)), Some("12".into()));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({})), None);
    }
}
