/* src/render/script/rust/src/helpers.rs */

use serde_json::Value;

/// JS number to JSON value. Integral values stay integers so they print
/// without a fraction; NaN and infinities have no JSON form and become null.
pub fn number(n: f64) -> Value {
  if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
    if n == 0.0 {
      return Value::from(0);
    }
    return Value::from(n as i64);
  }
  serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
}

pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

/// Display form used by interpolation: null renders empty, arrays join with
/// commas, objects render as JSON.
pub fn stringify(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => s.clone(),
    Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
    other => other.to_string(),
  }
}

/// String coercion used by `+` concatenation and `String(x)`.
pub fn to_js_string(value: &Value) -> String {
  match value {
    Value::Null => "null".to_string(),
    other => stringify(other),
  }
}

pub fn to_number(value: &Value) -> Option<f64> {
  match value {
    Value::Null => Some(0.0),
    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
    Value::Number(n) => n.as_f64(),
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() { Some(0.0) } else { trimmed.parse::<f64>().ok() }
    }
    Value::Array(items) if items.is_empty() => Some(0.0),
    Value::Array(items) if items.len() == 1 => to_number(&items[0]),
    _ => None,
  }
}

pub fn type_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "undefined",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) | Value::Object(_) => "object",
  }
}

pub fn strict_eq(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

pub fn loose_eq(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Null, Value::Null) => true,
    (Value::Null, _) | (_, Value::Null) => false,
    (Value::String(_), Value::String(_)) | (Value::Array(_), _) | (_, Value::Array(_)) => {
      strict_eq(a, b)
    }
    (Value::Object(_), _) | (_, Value::Object(_)) => strict_eq(a, b),
    _ => match (to_number(a), to_number(b)) {
      (Some(x), Some(y)) => x == y,
      _ => false,
    },
  }
}

pub fn truncate(snippet: &str, max: usize) -> String {
  let trimmed = snippet.trim();
  if trimmed.chars().count() <= max {
    return trimmed.to_string();
  }
  let mut out: String = trimmed.chars().take(max).collect();
  out.push_str("...");
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn number_keeps_integers() {
    assert_eq!(number(3.0), json!(3));
    assert_eq!(number(-0.0), json!(0));
    assert_eq!(number(1.5), json!(1.5));
    assert_eq!(number(f64::NAN), Value::Null);
    assert_eq!(number(f64::INFINITY), Value::Null);
  }

  #[test]
  fn truthy_values() {
    assert!(is_truthy(&json!(true)));
    assert!(is_truthy(&json!(1)));
    assert!(is_truthy(&json!(-1)));
    assert!(is_truthy(&json!(0.5)));
    assert!(is_truthy(&json!("hello")));
    assert!(is_truthy(&json!([])));
    assert!(is_truthy(&json!({})));
  }

  #[test]
  fn falsy_values() {
    assert!(!is_truthy(&json!(false)));
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&json!(0.0)));
    assert!(!is_truthy(&json!("")));
  }

  #[test]
  fn stringify_display_forms() {
    assert_eq!(stringify(&json!(null)), "");
    assert_eq!(stringify(&json!(42)), "42");
    assert_eq!(stringify(&json!(2.5)), "2.5");
    assert_eq!(stringify(&json!("hi")), "hi");
    assert_eq!(stringify(&json!(false)), "false");
    assert_eq!(stringify(&json!(["a", 1, null])), "a,1,");
    assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
  }

  #[test]
  fn js_string_null() {
    assert_eq!(to_js_string(&json!(null)), "null");
    assert_eq!(to_js_string(&json!(7)), "7");
  }

  #[test]
  fn to_number_coercions() {
    assert_eq!(to_number(&json!("  12 ")), Some(12.0));
    assert_eq!(to_number(&json!("")), Some(0.0));
    assert_eq!(to_number(&json!("abc")), None);
    assert_eq!(to_number(&json!(true)), Some(1.0));
    assert_eq!(to_number(&json!({})), None);
  }

  #[test]
  fn equality_rules() {
    assert!(loose_eq(&json!(1), &json!("1")));
    assert!(loose_eq(&json!(0), &json!(false)));
    assert!(!loose_eq(&json!(null), &json!(0)));
    assert!(strict_eq(&json!(1), &json!(1.0)));
    assert!(!strict_eq(&json!(1), &json!("1")));
  }

  #[test]
  fn truncate_long_snippets() {
    assert_eq!(truncate("  short ", 10), "short");
    assert_eq!(truncate("abcdefghij", 4), "abcd...");
  }
}
