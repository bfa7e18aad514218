//! Output Comparator - Representation-Tolerant Output Matching
//!
//! **Core Responsibility:**
//! Decide whether an actual output matches an expected output.
//!
//! **Critical Properties:**
//! - Knows nothing about the execution backend
//! - Knows nothing about job status
//! - Pure function: (actual, expected) → verdict + note
//!
//! **Rules (first match wins):**
//! 1. Both empty → pass
//! 2. Exactly one empty → fail
//! 3. Normalized text equal → pass
//! 4. Both parse as JSON arrays/objects and are structurally equal → pass
//! 5. Both parse as scalar token sequences of equal elements → pass
//! 6. Otherwise fail, note carries both normalized forms
//!
//! **Normalization:**
//! - Trim leading and trailing whitespace
//! - `\r\n` and `\r` become `\n`
//! - Any run of whitespace (newlines included) becomes one space
//! - Case sensitive

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub passed: bool,
    pub note: String,
}

impl Comparison {
    fn pass(note: &str) -> Self {
        Self {
            passed: true,
            note: note.to_string(),
        }
    }

    fn fail(actual: &str, expected: &str) -> Self {
        Self {
            passed: false,
            note: format!("Output mismatch: actual=\"{}\", expected=\"{}\"", actual, expected),
        }
    }
}

/// Normalize output string for comparison
pub fn normalize_output(output: &str) -> String {
    let unified = output.trim().replace("\r\n", "\n").replace('\r', "\n");
    unified.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn compare(actual: &str, expected: &str) -> Comparison {
    let actual_empty = actual.trim().is_empty();
    let expected_empty = expected.trim().is_empty();

    if actual_empty && expected_empty {
        return Comparison::pass("Both outputs are empty");
    }
    if actual_empty || expected_empty {
        return Comparison::fail(actual.trim(), expected.trim());
    }

    let actual = normalize_output(actual);
    let expected = normalize_output(expected);

    if actual == expected {
        return Comparison::pass("Outputs match exactly");
    }

    if let (Some(a), Some(b)) = (parse_structured(&actual), parse_structured(&expected)) {
        if json_equal(&a, &b) {
            return Comparison::pass("Outputs match (structural comparison)");
        }
    }

    if let (Some(a), Some(b)) = (parse_sequence(&actual), parse_sequence(&expected)) {
        if a == b {
            return Comparison::pass("Outputs match (token sequence comparison)");
        }
    }

    Comparison::fail(&actual, &expected)
}

fn parse_structured(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s)
        .ok()
        .filter(|v| v.is_array() || v.is_object())
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
}

/// A JSON array of scalars, or more than one whitespace separated token
fn parse_sequence(s: &str) -> Option<Vec<Token>> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
        return items.iter().map(scalar_token).collect();
    }

    let tokens: Vec<Token> = s.split_whitespace().map(text_token).collect();
    (tokens.len() > 1).then_some(tokens)
}

fn scalar_token(value: &Value) -> Option<Token> {
    match value {
        Value::Number(n) => n.as_f64().map(Token::Number),
        Value::String(s) => Some(Token::Text(s.clone())),
        Value::Bool(b) => Some(Token::Text(b.to_string())),
        Value::Null => Some(Token::Text("null".to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_token(raw: &str) -> Token {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Token::Number(n),
        _ => Token::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("hello"), "hello");
        assert_eq!(normalize_output("  hello  "), "hello");
        assert_eq!(normalize_output("hello\r\n"), "hello");
        assert_eq!(normalize_output("line1\r\nline2\rline3"), "line1 line2 line3");
        assert_eq!(normalize_output("a   b\t\tc"), "a b c");
        assert_eq!(normalize_output("   "), "");
    }

    #[test]
    fn test_both_empty() {
        assert!(compare("", "").passed);
        assert!(compare("   \n", "").passed);
    }

    #[test]
    fn test_one_empty() {
        assert!(!compare("1", "").passed);
        assert!(!compare("", "1").passed);
    }

    #[test]
    fn test_exact_match_after_normalization() {
        let result = compare("  hello world \r\n", "hello   world");
        assert!(result.passed);
        assert_eq!(result.note, "Outputs match exactly");
    }

    #[test]
    fn test_newline_handling() {
        assert!(compare("line1\nline2\nline3\n", "line1\r\nline2\r\nline3").passed);
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(!compare("hello", "Hello").passed);
    }

    #[test]
    fn test_array_spacing_differences() {
        let result = compare("[0,1]", "[0, 1]");
        assert!(result.passed);
        assert!(result.note.contains("structural"));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(compare("[1.0, 2]", "[1,2.0]").passed);
    }

    #[test]
    fn test_object_key_order_ignored() {
        assert!(compare(r#"{"a":1,"b":[2,3]}"#, r#"{"b": [2, 3], "a": 1}"#).passed);
        assert!(!compare(r#"{"a":1}"#, r#"{"a":1,"b":2}"#).passed);
    }

    #[test]
    fn test_space_separated_against_array() {
        let result = compare("1 2 3", "[1,2,3]");
        assert!(result.passed);
        assert!(result.note.contains("token sequence"));
    }

    #[test]
    fn test_token_sequence_numeric_coercion() {
        assert!(compare("1.50 2", "1.5 2.0").passed);
        assert!(!compare("1 2 3", "[1,2]").passed);
    }

    #[test]
    fn test_single_token_is_not_a_sequence() {
        assert!(!compare("5", "[5]").passed);
    }

    #[test]
    fn test_nested_arrays_are_not_scalar_sequences() {
        assert!(!compare("1 2", "[[1],[2]]").passed);
    }

    #[test]
    fn test_mismatch_note_contains_normalized_forms() {
        let result = compare(" [0, 1]\n", "[1,2]");
        assert!(!result.passed);
        assert_eq!(result.note, "Output mismatch: actual=\"[0, 1]\", expected=\"[1,2]\"");
    }
}
