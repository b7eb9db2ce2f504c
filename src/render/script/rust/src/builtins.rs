/* src/render/script/rust/src/builtins.rs */

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::errors::{EvalResult, ScriptError};
use crate::eval::MAX_STRING_LEN;
use crate::helpers::{number, stringify, strict_eq, to_js_string, to_number};

/// Array methods that rewrite their receiver in place.
const MUTATING_METHODS: &[&str] = &["push", "pop", "shift", "unshift", "splice", "reverse", "sort"];

/// Array methods whose first argument is a callback.
pub(crate) const CALLBACK_METHODS: &[&str] =
  &["filter", "map", "find", "findIndex", "some", "every", "forEach"];

pub(crate) const NAMESPACES: &[&str] =
  &["console", "Math", "JSON", "Object", "Array", "Date", "Number"];

pub(crate) fn is_mutating(method: &str) -> bool {
  MUTATING_METHODS.contains(&method)
}

fn arg(args: &[Value], i: usize) -> &Value {
  args.get(i).unwrap_or(&Value::Null)
}

fn num_arg(args: &[Value], i: usize) -> Option<f64> {
  args.get(i).filter(|v| !v.is_null()).and_then(to_number)
}

/// JS relative index: negatives count from the end, result clamped to `0..=len`.
fn relative_index(index: f64, len: usize) -> usize {
  let len_f = len as f64;
  let resolved =
    if index < 0.0 { (len_f + index.trunc()).max(0.0) } else { index.trunc().min(len_f) };
  resolved as usize
}

fn console_text(args: &[Value]) -> String {
  args
    .iter()
    .map(|v| match v {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Free functions: `Number(x)`, `parseInt(x)`, ...
pub(crate) fn call_global(name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
  let value = match name {
    "Number" => args.first().map_or(Value::from(0), |v| to_number(v).map_or(Value::Null, number)),
    "String" => Value::String(args.first().map(to_js_string).unwrap_or_default()),
    "Boolean" => Value::Bool(crate::helpers::is_truthy(arg(args, 0))),
    "parseInt" => {
      let text = to_js_string(arg(args, 0));
      let text = text.trim();
      let radix = num_arg(args, 1).map_or(10, |r| r as u32);
      let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
      };
      let digits = if radix == 16 {
        digits.trim_start_matches("0x").trim_start_matches("0X")
      } else {
        digits
      };
      let valid: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
      match i64::from_str_radix(&valid, radix) {
        Ok(n) => Value::from(if negative { -n } else { n }),
        Err(_) => Value::Null,
      }
    }
    "parseFloat" => {
      let text = to_js_string(arg(args, 0));
      let text = text.trim();
      let end = text
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && matches!(c, '-' | '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
      text[..end].parse::<f64>().map_or(Value::Null, number)
    }
    "isNaN" => Value::Bool(to_number(arg(args, 0)).is_none_or(f64::is_nan)),
    _ => return None,
  };
  Some(Ok(value))
}

/// Namespaced helpers: `console.log`, `Math.max`, `JSON.stringify`, ...
pub(crate) fn call_namespace(ns: &str, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
  match ns {
    "console" => {
      let text = console_text(args);
      match name {
        "error" => tracing::error!(target: "cms_script::console", "{text}"),
        "warn" => tracing::warn!(target: "cms_script::console", "{text}"),
        "debug" | "trace" => tracing::debug!(target: "cms_script::console", "{text}"),
        "log" | "info" => tracing::info!(target: "cms_script::console", "{text}"),
        _ => return None,
      }
      Some(Ok(Value::Null))
    }
    "Math" => math(name, args).map(Ok),
    "JSON" => match name {
      "stringify" => {
        let value = arg(args, 0);
        let text = if args.get(2).is_some_and(|v| !v.is_null()) {
          serde_json::to_string_pretty(value)
        } else {
          serde_json::to_string(value)
        };
        Some(text.map(Value::String).map_err(|e| ScriptError::type_error(e.to_string())))
      }
      "parse" => {
        let text = to_js_string(arg(args, 0));
        Some(
          serde_json::from_str::<Value>(&text)
            .map_err(|e| ScriptError::Thrown(format!("SyntaxError: {e}"))),
        )
      }
      _ => None,
    },
    "Object" => {
      let Value::Object(map) = arg(args, 0) else {
        return match name {
          "keys" | "values" | "entries" => Some(Ok(Value::Array(Vec::new()))),
          _ => None,
        };
      };
      let value = match name {
        "keys" => Value::Array(map.keys().cloned().map(Value::String).collect()),
        "values" => Value::Array(map.values().cloned().collect()),
        "entries" => Value::Array(
          map
            .iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect(),
        ),
        _ => return None,
      };
      Some(Ok(value))
    }
    "Array" => match name {
      "isArray" => Some(Ok(Value::Bool(arg(args, 0).is_array()))),
      _ => None,
    },
    "Number" => {
      let n = arg(args, 0).as_f64();
      match name {
        "isInteger" => Some(Ok(Value::Bool(n.is_some_and(|f| f.fract() == 0.0)))),
        "isFinite" => Some(Ok(Value::Bool(n.is_some_and(f64::is_finite)))),
        _ => None,
      }
    }
    "Date" => match name {
      "now" => {
        let millis = std::time::SystemTime::now()
          .duration_since(std::time::UNIX_EPOCH)
          .map_or(0, |d| d.as_millis());
        Some(Ok(Value::from(millis as u64)))
      }
      _ => None,
    },
    _ => None,
  }
}

fn math(name: &str, args: &[Value]) -> Option<Value> {
  let x = num_arg(args, 0).unwrap_or(f64::NAN);
  let result = match name {
    "floor" => x.floor(),
    "ceil" => x.ceil(),
    "round" => (x + 0.5).floor(),
    "trunc" => x.trunc(),
    "abs" => x.abs(),
    "sqrt" => x.sqrt(),
    "sign" => {
      if x == 0.0 {
        0.0
      } else {
        x.signum()
      }
    }
    "pow" => x.powf(num_arg(args, 1).unwrap_or(f64::NAN)),
    "min" | "max" => {
      let values: Option<Vec<f64>> = args.iter().map(to_number).collect();
      let values = values?;
      if name == "min" {
        values.into_iter().fold(f64::INFINITY, f64::min)
      } else {
        values.into_iter().fold(f64::NEG_INFINITY, f64::max)
      }
    }
    "random" => {
      let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
      f64::from(nanos % 1_000_000) / 1_000_000.0
    }
    _ => return None,
  };
  Some(number(result))
}

/// Method call on a value. `None` means the method does not exist for the
/// receiver type.
pub(crate) fn call_method(
  target: &mut Value,
  name: &str,
  args: &[Value],
) -> Option<EvalResult<Value>> {
  if name == "toString" {
    return Some(Ok(Value::String(to_js_string(target))));
  }
  match target {
    Value::Array(items) => array_method(items, name, args),
    Value::String(s) => string_method(s, name, args),
    Value::Number(n) => match name {
      "toFixed" => {
        let digits = num_arg(args, 0).map_or(0, |d| d.clamp(0.0, 20.0) as usize);
        let value = n.as_f64().unwrap_or(0.0);
        Some(Ok(Value::String(format!("{value:.digits$}"))))
      }
      _ => None,
    },
    Value::Object(map) => object_method(map, name, args),
    _ => None,
  }
}

fn object_method(
  map: &mut Map<String, Value>,
  name: &str,
  args: &[Value],
) -> Option<EvalResult<Value>> {
  match name {
    "hasOwnProperty" => Some(Ok(Value::Bool(map.contains_key(&stringify(arg(args, 0)))))),
    _ => None,
  }
}

fn array_method(items: &mut Vec<Value>, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
  let len = items.len();
  let value = match name {
    "push" => {
      items.extend(args.iter().cloned());
      Value::from(items.len())
    }
    "pop" => items.pop().unwrap_or(Value::Null),
    "shift" => {
      if items.is_empty() {
        Value::Null
      } else {
        items.remove(0)
      }
    }
    "unshift" => {
      for (i, v) in args.iter().enumerate() {
        items.insert(i, v.clone());
      }
      Value::from(items.len())
    }
    "splice" => {
      let start = relative_index(num_arg(args, 0).unwrap_or(0.0), len);
      let delete = num_arg(args, 1).map_or(len - start, |d| (d.max(0.0) as usize).min(len - start));
      let inserted = args.iter().skip(2).cloned();
      let removed: Vec<Value> = items.splice(start..start + delete, inserted).collect();
      Value::Array(removed)
    }
    "reverse" => {
      items.reverse();
      Value::Array(items.clone())
    }
    "sort" => {
      items.sort_by(|a, b| match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => to_js_string(a).cmp(&to_js_string(b)),
      });
      Value::Array(items.clone())
    }
    "slice" => {
      let start = relative_index(num_arg(args, 0).unwrap_or(0.0), len);
      let end = relative_index(num_arg(args, 1).unwrap_or(len as f64), len);
      Value::Array(if start < end { items[start..end].to_vec() } else { Vec::new() })
    }
    "indexOf" => {
      let needle = arg(args, 0);
      items.iter().position(|v| strict_eq(v, needle)).map_or(Value::from(-1), Value::from)
    }
    "includes" => Value::Bool(items.iter().any(|v| strict_eq(v, arg(args, 0)))),
    "join" => {
      let sep = args.first().filter(|v| !v.is_null()).map_or_else(|| ",".to_string(), to_js_string);
      Value::String(items.iter().map(stringify).collect::<Vec<_>>().join(&sep))
    }
    "concat" => {
      let mut out = items.clone();
      for v in args {
        match v {
          Value::Array(more) => out.extend(more.iter().cloned()),
          other => out.push(other.clone()),
        }
      }
      Value::Array(out)
    }
    "at" => {
      let i = num_arg(args, 0).unwrap_or(0.0);
      let idx = if i < 0.0 { len as f64 + i } else { i };
      if idx < 0.0 { Value::Null } else { items.get(idx as usize).cloned().unwrap_or(Value::Null) }
    }
    _ => return None,
  };
  Some(Ok(value))
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
  let chars: Vec<char> = s.chars().collect();
  let len = chars.len();
  let text_arg = |i: usize| to_js_string(arg(args, i));
  let value = match name {
    "toUpperCase" => Value::String(s.to_uppercase()),
    "toLowerCase" => Value::String(s.to_lowercase()),
    "trim" => Value::String(s.trim().to_string()),
    "split" => {
      let parts: Vec<Value> = match args.first() {
        None | Some(Value::Null) => vec![Value::String(s.to_string())],
        Some(sep) => {
          let sep = to_js_string(sep);
          if sep.is_empty() {
            chars.iter().map(|c| Value::String(c.to_string())).collect()
          } else {
            s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()
          }
        }
      };
      Value::Array(parts)
    }
    "includes" => Value::Bool(s.contains(text_arg(0).as_str())),
    "startsWith" => Value::Bool(s.starts_with(text_arg(0).as_str())),
    "endsWith" => Value::Bool(s.ends_with(text_arg(0).as_str())),
    "indexOf" => {
      let needle = text_arg(0);
      s.find(needle.as_str()).map_or(Value::from(-1), |byte| Value::from(s[..byte].chars().count()))
    }
    "slice" | "substring" => {
      let mut start = num_arg(args, 0).unwrap_or(0.0);
      let mut end = num_arg(args, 1).unwrap_or(len as f64);
      if name == "substring" {
        start = start.max(0.0);
        end = end.max(0.0);
        if start > end {
          std::mem::swap(&mut start, &mut end);
        }
      }
      let start = relative_index(start, len);
      let end = relative_index(end, len);
      Value::String(if start < end { chars[start..end].iter().collect() } else { String::new() })
    }
    "charAt" => {
      let i = num_arg(args, 0).unwrap_or(0.0);
      let ch = if i >= 0.0 { chars.get(i as usize).map(char::to_string) } else { None };
      Value::String(ch.unwrap_or_default())
    }
    "replace" => Value::String(s.replacen(text_arg(0).as_str(), text_arg(1).as_str(), 1)),
    "replaceAll" => Value::String(s.replace(text_arg(0).as_str(), text_arg(1).as_str())),
    "padStart" | "padEnd" => {
      let target = num_arg(args, 0).unwrap_or(0.0).max(0.0);
      if target > MAX_STRING_LEN as f64 {
        return Some(Err(ScriptError::type_error("Invalid string length")));
      }
      let target = target as usize;
      let fill = args.get(1).map_or_else(|| " ".to_string(), to_js_string);
      if target <= len || fill.is_empty() {
        Value::String(s.to_string())
      } else {
        let pad: String = fill.chars().cycle().take(target - len).collect();
        Value::String(if name == "padStart" { format!("{pad}{s}") } else { format!("{s}{pad}") })
      }
    }
    "repeat" => {
      let count = num_arg(args, 0).unwrap_or(0.0).max(0.0);
      if count * s.len() as f64 > MAX_STRING_LEN as f64 {
        return Some(Err(ScriptError::type_error("Invalid count value")));
      }
      Value::String(s.repeat(count as usize))
    }
    _ => return None,
  };
  Some(Ok(value))
}
