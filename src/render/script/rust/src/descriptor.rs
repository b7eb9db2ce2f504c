/* src/render/script/rust/src/descriptor.rs */

//! Best-effort member extraction for page and component scripts.
//!
//! This is a tolerant structural scan of semi-free-form script text, not a
//! language-correct parser. Accepted top-level shapes:
//!
//! - `name: value;`, `name: Type = value;`, `let|const|var name = value;`
//!   where `value` is a literal (boolean, `null`, `undefined`, number, string,
//!   array or object literal), evaluated alone in an empty scope
//! - `name(params) { body }`, optionally prefixed by `async` or `function`,
//!   and `name: function(params) { body }`
//! - `function onInit() { ... }` / `function onDestroy() { ... }` (also the
//!   method form and the `ngOnInit` / `ngOnDestroy` spellings)
//! - a `class Name { ... }` wrapper, whose body is scanned the same way
//!
//! Anything else is skipped up to the next top-level `;` or closing brace and
//! logged. Garbage in yields an empty descriptor, never an error.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::ast::{Expr, Stmt};
use crate::eval::{MethodTable, Scope};
use crate::helpers::truncate;
use crate::parser::{parse_expression, parse_statements};

const SNIPPET_LEN: usize = 80;

const RESERVED: &[&str] = &[
  "if", "for", "while", "switch", "return", "function", "catch", "do", "else", "new", "typeof",
  "constructor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleHook {
  Init,
  Destroy,
}

impl LifecycleHook {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "onInit" | "ngOnInit" => Some(Self::Init),
      "onDestroy" | "ngOnDestroy" => Some(Self::Destroy),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Init => "onInit",
      Self::Destroy => "onDestroy",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptMember {
  Property { name: String, type_annotation: Option<String>, value: Value },
  Method { name: String, params: Vec<String>, body: Vec<Stmt> },
  Lifecycle { hook: LifecycleHook, body: Vec<Stmt> },
}

impl ScriptMember {
  pub fn name(&self) -> &str {
    match self {
      Self::Property { name, .. } | Self::Method { name, .. } => name,
      Self::Lifecycle { hook, .. } => hook.as_str(),
    }
  }
}

/// Validated result of scanning a script: members in source order plus the
/// snippets that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptDescriptor {
  pub members: Vec<ScriptMember>,
  pub skipped: Vec<String>,
}

impl ScriptDescriptor {
  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  /// Declared properties; a later declaration of the same name wins.
  pub fn properties(&self) -> BTreeMap<String, Value> {
    self
      .members
      .iter()
      .filter_map(|m| match m {
        ScriptMember::Property { name, value, .. } => Some((name.clone(), value.clone())),
        _ => None,
      })
      .collect()
  }

  pub fn methods(&self) -> impl Iterator<Item = (&str, &[String], &[Stmt])> {
    self.members.iter().filter_map(|m| match m {
      ScriptMember::Method { name, params, body } => {
        Some((name.as_str(), params.as_slice(), body.as_slice()))
      }
      _ => None,
    })
  }

  pub fn hook(&self, hook: LifecycleHook) -> Option<&[Stmt]> {
    self.members.iter().rev().find_map(|m| match m {
      ScriptMember::Lifecycle { hook: h, body } if *h == hook => Some(body.as_slice()),
      _ => None,
    })
  }
}

fn lifecycle_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^(?:async\s+)?(?:function\s+)?(onInit|onDestroy|ngOnInit|ngOnDestroy)\s*\(\s*\)\s*(?::\s*\w+\s*)?\{")
      .unwrap()
  })
}

fn method_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^(?:async\s+)?(?:function\s+)?([A-Za-z_$][\w$]*)\s*\(([^()]*)\)\s*(?::\s*[\w$<>\[\]| ]+)?\{")
      .unwrap()
  })
}

fn function_property_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*)\s*[:=]\s*(?:async\s+)?function\s*\(([^()]*)\)\s*\{").unwrap()
  })
}

fn class_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^(?:export\s+)?(?:default\s+)?class\s+[A-Za-z_$][\w$]*[^{;]*\{").unwrap())
}

fn property_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^(?:(?:let|const|var|public|private|readonly)\s+)?([A-Za-z_$][\w$]*)\s*([:=])")
      .unwrap()
  })
}

fn typed_value_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z_$][\w$.<>\[\]|, ]*?)\s*=([^=>][\s\S]*)$").unwrap())
}

enum Segment {
  Member(ScriptMember, usize),
  /// Descend into a wrapper body starting at the given offset.
  Enter(usize),
  Skip(usize, String),
}

/// Scan `source` into a descriptor. Deterministic: identical text yields an
/// equal descriptor.
pub fn parse_script(source: &str) -> ScriptDescriptor {
  let src = strip_comments(source);
  let bytes = src.as_bytes();
  let mut desc = ScriptDescriptor::default();
  let mut pos = 0;

  while pos < bytes.len() {
    let c = bytes[pos];
    if c.is_ascii_whitespace() || matches!(c, b';' | b',' | b'}') {
      pos += 1;
      continue;
    }
    match next_segment(&src, pos) {
      Segment::Member(member, next) => {
        desc.members.push(member);
        pos = next;
      }
      Segment::Enter(next) => pos = next,
      Segment::Skip(next, reason) => {
        let next = next.max(pos + 1).min(bytes.len());
        let snippet = truncate(&src[pos..next], SNIPPET_LEN);
        tracing::warn!(snippet = %snippet, reason = %reason, "skipping script segment");
        desc.skipped.push(snippet);
        pos = next;
      }
    }
  }

  desc
}

fn next_segment(src: &str, pos: usize) -> Segment {
  let rest = &src[pos..];
  let bytes = src.as_bytes();

  if let Some(caps) = lifecycle_re().captures(rest) {
    let open = caps.get(0).map_or(pos, |m| pos + m.end() - 1);
    let Some(close) = matching_close(bytes, open) else {
      return Segment::Skip(bytes.len(), "unterminated hook body".into());
    };
    let hook = caps.get(1).and_then(|m| LifecycleHook::from_name(m.as_str()));
    return match (hook, parse_statements(&src[open + 1..close])) {
      (Some(hook), Ok(body)) => Segment::Member(ScriptMember::Lifecycle { hook, body }, close + 1),
      (_, Err(e)) => Segment::Skip(close + 1, e.to_string()),
      (None, _) => Segment::Skip(close + 1, "unknown hook".into()),
    };
  }

  let method_caps = function_property_re().captures(rest).or_else(|| method_re().captures(rest));
  if let Some(caps) = method_caps {
    let name = caps.get(1).map_or("", |m| m.as_str());
    let open = caps.get(0).map_or(pos, |m| pos + m.end() - 1);
    let Some(close) = matching_close(bytes, open) else {
      return Segment::Skip(bytes.len(), "unterminated method body".into());
    };
    if RESERVED.contains(&name) {
      return Segment::Skip(close + 1, format!("'{name}' block is not a member"));
    }
    let params = parse_params(caps.get(2).map_or("", |m| m.as_str()));
    return match parse_statements(&src[open + 1..close]) {
      Ok(body) => {
        Segment::Member(ScriptMember::Method { name: name.to_string(), params, body }, close + 1)
      }
      Err(e) => Segment::Skip(close + 1, e.to_string()),
    };
  }

  if let Some(m) = class_re().find(rest) {
    return Segment::Enter(pos + m.end());
  }

  if let Some(caps) = property_re().captures(rest) {
    let name = caps.get(1).map_or("", |m| m.as_str());
    let separator = caps.get(2).map_or("", |m| m.as_str());
    let value_start = pos + caps.get(0).map_or(0, |m| m.end());
    let end = value_end(bytes, value_start);
    if RESERVED.contains(&name) {
      return Segment::Skip(end, format!("'{name}' is reserved"));
    }
    let raw = &src[value_start..end];
    let (type_annotation, value_src) = match (separator, typed_value_re().captures(raw)) {
      (":", Some(typed)) => (
        typed.get(1).map(|m| m.as_str().trim().to_string()),
        typed.get(2).map_or("", |m| m.as_str()),
      ),
      _ => (None, raw),
    };
    return match literal_value(value_src) {
      Ok(value) => Segment::Member(
        ScriptMember::Property { name: name.to_string(), type_annotation, value },
        end,
      ),
      Err(reason) => Segment::Skip(end, reason),
    };
  }

  Segment::Skip(value_end(bytes, pos), "unrecognized member".into())
}

/// Evaluate a property value in isolation; only literal shapes are accepted.
fn literal_value(src: &str) -> Result<Value, String> {
  let src = src.trim();
  if src.is_empty() {
    return Err("missing property value".into());
  }
  let expr = parse_expression(src).map_err(|e| e.to_string())?;
  if !expr.is_literal_shape() {
    return Err(format!("unsupported property value shape: {}", describe(&expr)));
  }
  let mut props = Map::new();
  let methods = MethodTable::new();
  Scope::new(&mut props, &methods).eval(&expr).map_err(|e| e.to_string())
}

fn describe(expr: &Expr) -> &'static str {
  match expr {
    Expr::Ident(_) => "identifier",
    Expr::Call { .. } => "call",
    Expr::Arrow { .. } => "arrow function",
    Expr::Binary { .. } | Expr::Logical { .. } => "operator expression",
    _ => "expression",
  }
}

/// Parameter names, dropping type annotations and default values.
fn parse_params(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .filter_map(|p| {
      let p = p.trim();
      let name: String =
        p.chars().take_while(|&c| c.is_ascii_alphanumeric() || c == '_' || c == '$').collect();
      (!name.is_empty()).then_some(name)
    })
    .collect()
}

fn skip_quoted(bytes: &[u8], start: usize) -> usize {
  let quote = bytes[start];
  let mut i = start + 1;
  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 2,
      c if c == quote => return i + 1,
      b'\n' if quote != b'`' => return i,
      _ => i += 1,
    }
  }
  bytes.len()
}

/// Index of the bracket closing the one at `open`, string aware.
fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
  let mut depth = 0usize;
  let mut i = open;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' | b'`' => {
        i = skip_quoted(bytes, i);
        continue;
      }
      b'{' | b'[' | b'(' => depth += 1,
      b'}' | b']' | b')' => {
        depth = depth.saturating_sub(1);
        if depth == 0 {
          return Some(i);
        }
      }
      _ => {}
    }
    i += 1;
  }
  None
}

/// End of a property value: the first top-level `;`, `,` or line break, or an
/// unbalanced closing brace.
fn value_end(bytes: &[u8], start: usize) -> usize {
  let mut depth = 0usize;
  let mut seen_content = false;
  let mut i = start;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' | b'`' => {
        i = skip_quoted(bytes, i);
        seen_content = true;
        continue;
      }
      b'{' | b'[' | b'(' => depth += 1,
      b'}' | b']' | b')' => {
        if depth == 0 {
          return i;
        }
        depth -= 1;
      }
      b';' | b',' if depth == 0 => return i,
      b'\n' if depth == 0 && seen_content => return i,
      c if !c.is_ascii_whitespace() => seen_content = true,
      _ => {}
    }
    i += 1;
  }
  bytes.len()
}

/// Remove `//` and `/* */` comments outside string literals. Line breaks
/// inside block comments are kept so line-based boundaries survive.
fn strip_comments(src: &str) -> String {
  let bytes = src.as_bytes();
  let mut out = String::with_capacity(src.len());
  let mut last = 0;
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i),
      b'/' if bytes.get(i + 1) == Some(&b'/') => {
        out.push_str(&src[last..i]);
        while i < bytes.len() && bytes[i] != b'\n' {
          i += 1;
        }
        last = i;
      }
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        out.push_str(&src[last..i]);
        let end = src[i + 2..].find("*/").map_or(bytes.len(), |e| i + 2 + e + 2);
        let newlines = src[i..end].matches('\n').count();
        out.push_str(&"\n".repeat(newlines));
        out.push(' ');
        i = end;
        last = i;
      }
      _ => i += 1,
    }
  }
  out.push_str(&src[last..]);
  out
}
