//! Robust parsing of LLM JSON replies (§4.6): markdown-fence stripping,
//! trailing-comma/missing-comma cleanup, and a regex-based
//! largest-balanced-object fallback.

use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use super::types::{ExtractedRecord, LineItem};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in LLM response")]
    NoJsonFound,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Strips common LLM formatting noise before JSON parsing:
/// ` ```json ... ``` ` fences, trailing commas before `}`/`]`, and the
/// most common "missing comma" stitches between adjacent object/array
/// tokens (`}{`, `][`, `"{`, `}"`).
#[must_use]
pub fn clean_llm_text(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped.to_string();
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped.to_string();
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped.to_string();
    }
    text = text.trim().to_string();

    let trailing_comma = Regex::new(r",\s*([}\]])").expect("valid regex");
    text = trailing_comma.replace_all(&text, "$1").into_owned();

    let missing_comma = Regex::new(r"([}\]])\s*([{\[])").expect("valid regex");
    text = missing_comma.replace_all(&text, "$1,$2").into_owned();

    text
}

/// Parses `raw` as JSON after cleanup; on strict failure, falls back to
/// extracting the largest balanced `{…}` substring and retrying.
pub fn parse_json_lenient(raw: &str) -> Result<Value, ParseError> {
    let cleaned = clean_llm_text(raw);

    match serde_json::from_str(&cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => {
            if let Some(candidate) = largest_balanced_object(&cleaned) {
                if let Ok(value) = serde_json::from_str(&candidate) {
                    return Ok(value);
                }
            }
            if candidate_exists(&cleaned) {
                return Err(ParseError::InvalidJson(e.to_string()));
            }
            Err(ParseError::NoJsonFound)
        }
    }
}

fn candidate_exists(text: &str) -> bool {
    text.contains('{') && text.contains('}')
}

/// Scans `text` for the largest `{…}` span with balanced braces,
/// ignoring braces inside string literals.
fn largest_balanced_object(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut best: Option<(usize, usize)> = None;
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => stack.push(i),
            '}' => {
                if let Some(start) = stack.pop() {
                    if stack.is_empty() {
                        let len = i - start;
                        if best.is_none_or(|(_, best_len)| len > best_len) {
                            best = Some((start, len));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(start, len)| chars[start..=start + len].iter().collect())
}

/// Default confidence assigned to a field the LLM reported but that
/// failed type coercion; §4.6: "any invalid field is set to null and its
/// confidence set to 0.5".
const INVALID_FIELD_CONFIDENCE: f32 = 0.5;

/// Coerces a parsed JSON object into an `ExtractedRecord`, nulling out
/// and down-weighting any field that fails type coercion rather than
/// failing the whole record.
#[must_use]
pub fn coerce_record(value: &Value) -> ExtractedRecord {
    let mut field_confidence: HashMap<String, f32> = value
        .get("field_confidence")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f as f32)))
                .collect()
        })
        .unwrap_or_default();

    let vendor = coerce_string(value.get("vendor"));
    let description = coerce_string(value.get("description"));
    let category = coerce_string(value.get("category"));
    let payment_method = coerce_string(value.get("payment_method"));
    let recipient_id = coerce_string(value.get("recipient_id"));
    let is_income = value.get("is_income").and_then(Value::as_bool);

    let amount = coerce_amount(value.get("amount"));
    if amount.is_none() && value.get("amount").is_some_and(|v| !v.is_null()) {
        field_confidence.insert("amount".to_string(), INVALID_FIELD_CONFIDENCE);
    }

    let date = coerce_date(value.get("date"));
    if date.is_none() && value.get("date").is_some_and(|v| !v.is_null()) {
        field_confidence.insert("date".to_string(), INVALID_FIELD_CONFIDENCE);
    }

    let line_items = value
        .get("line_items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| LineItem {
                    description: coerce_string(item.get("description")).unwrap_or_default(),
                    amount: coerce_amount(item.get("amount")),
                    quantity: coerce_amount(item.get("quantity")),
                })
                .collect()
        })
        .unwrap_or_default();

    ExtractedRecord {
        vendor,
        amount,
        date,
        description,
        category,
        payment_method,
        recipient_id,
        is_income,
        line_items,
        field_confidence,
        extraction_error: None,
    }
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string).filter(|s| !s.is_empty())
}

/// Coerces a numeric amount, stripping common currency noise (`$`, `,`)
/// when the LLM returns a string despite instructions to emit numerics.
fn coerce_amount(value: Option<&Value>) -> Option<Decimal> {
    let value = value?;
    if let Some(f) = value.as_f64() {
        return Decimal::try_from(f).ok();
    }
    if let Some(s) = value.as_str() {
        let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
        return cleaned.parse().ok();
    }
    None
}

fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"vendor\": \"Acme\"}\n```";
        let cleaned = clean_llm_text(raw);
        assert_eq!(cleaned, "{\"vendor\": \"Acme\"}");
    }

    #[test]
    fn removes_trailing_commas() {
        let raw = r#"{"vendor": "Acme", "amount": 10.00,}"#;
        let cleaned = clean_llm_text(raw);
        assert!(serde_json::from_str::<Value>(&cleaned).is_ok());
    }

    #[test]
    fn stitches_missing_comma_between_objects() {
        let raw = r#"{"a": 1}{"b": 2}"#;
        let cleaned = clean_llm_text(raw);
        assert_eq!(cleaned, r#"{"a": 1},{"b": 2}"#);
    }

    #[test]
    fn falls_back_to_largest_balanced_object_on_truncated_json() {
        let raw = r#"noise before {"vendor": "Acme", "amount": 10.00} trailing junk {"#;
        let value = parse_json_lenient(raw).unwrap();
        assert_eq!(value["vendor"], "Acme");
    }

    #[test]
    fn returns_no_json_found_when_nothing_parses() {
        let err = parse_json_lenient("not json at all").unwrap_err();
        assert!(matches!(err, ParseError::NoJsonFound));
    }

    #[test]
    fn coerces_currency_noise_out_of_amount() {
        let value = json!({"amount": "$1,234.56"});
        let record = coerce_record(&value);
        assert_eq!(record.amount, Some(Decimal::new(123_456, 2)));
    }

    #[test]
    fn invalid_amount_becomes_null_with_low_confidence() {
        let value = json!({"amount": "not-a-number"});
        let record = coerce_record(&value);
        assert_eq!(record.amount, None);
        assert_eq!(record.field_confidence.get("amount"), Some(&0.5));
    }

    #[test]
    fn parses_iso_date() {
        let value = json!({"date": "2025-10-07"});
        let record = coerce_record(&value);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 10, 7));
    }
}
