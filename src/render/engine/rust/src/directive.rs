/* src/render/engine/rust/src/directive.rs */

use std::sync::OnceLock;

use cms_script::helpers::{is_truthy, stringify, truncate};
use cms_script::{Bindings, PageScriptContext};
use regex::Regex;
use serde_json::Value;

use crate::dom::{Document, NodeId, NodeKind};
use crate::events::{ListenerScope, wire_events};
use crate::helpers::{decode_entities, escape_html, is_html_boolean_attr, is_raw_text_element};
use crate::mount::HOST_INSTANCE_ATTR;

pub const NG_FOR: &str = "*ngFor";
pub const NG_IF: &str = "*ngIf";
pub const INDEX_ATTR: &str = "data-index";

fn interpolation_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap())
}

fn repeat_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^\s*(?:let|const)\s+([A-Za-z_$][\w$]*)\s+of\s+([^;]+?)\s*(?:;(.*))?$").unwrap()
  })
}

fn index_alias_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"(?:let\s+([A-Za-z_$][\w$]*)\s*=\s*index\b|\bindex\s+as\s+([A-Za-z_$][\w$]*))").unwrap()
  })
}

/// A parsed `*ngFor` expression: `let item of items; let i = index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatSpec {
  pub item: String,
  pub iterable: String,
  pub index: Option<String>,
}

impl RepeatSpec {
  pub fn parse(src: &str) -> Option<Self> {
    let caps = repeat_re().captures(src)?;
    let item = caps.get(1)?.as_str().to_string();
    let iterable = caps.get(2)?.as_str().trim().to_string();
    let index = caps
      .get(3)
      .and_then(|rest| index_alias_re().captures(rest.as_str()))
      .and_then(|c| c.get(1).or_else(|| c.get(2)))
      .map(|m| m.as_str().to_string());
    Some(Self { item, iterable, index })
  }
}

/// Applies structural directives, interpolation and bindings to a
/// document subtree against one script context.
///
/// Passes run in order: repetition, conditionals, interpolation, property
/// bindings, event wiring. Repeated clones are processed in full with their
/// item bindings before they are spliced in, so later passes skip them.
/// Component hosts are boundaries: their content belongs to the component.
pub struct DirectiveProcessor<'c> {
  ctx: &'c mut PageScriptContext,
  scope: ListenerScope,
}

impl<'c> DirectiveProcessor<'c> {
  pub fn new(ctx: &'c mut PageScriptContext, scope: ListenerScope) -> Self {
    Self { ctx, scope }
  }

  /// Process the content of `root`. Running it again over its own output
  /// is a no-op: every directive attribute is consumed.
  pub fn process(&mut self, doc: &mut Document, root: NodeId, ambient: &Bindings) {
    self.process_scope(doc, root, false, ambient);
  }

  /// Returns false when `root` itself was dropped by a conditional.
  fn process_scope(
    &mut self,
    doc: &mut Document,
    root: NodeId,
    include_root: bool,
    ambient: &Bindings,
  ) -> bool {
    let mut expanded = Vec::new();
    for template in collect(doc, root, include_root, &[], |d, n| d.has_attr(n, NG_FOR)) {
      expanded.extend(self.expand_repeat(doc, template, ambient));
    }

    for node in collect(doc, root, include_root, &expanded, |d, n| d.has_attr(n, NG_IF)) {
      if !within(doc, node, root) {
        continue;
      }
      if !self.condition(doc, node, ambient) {
        if node == root {
          return false;
        }
        doc.replace_with(node, &[]);
      }
    }

    for node in collect(doc, root, include_root, &expanded, |_, _| true) {
      if !within(doc, node, root) {
        continue;
      }
      match doc.kind(node) {
        NodeKind::Text(_) => self.interpolate_text(doc, node, ambient),
        NodeKind::Element { .. } => {
          self.interpolate_attrs(doc, node, ambient);
          self.apply_bindings(doc, node, ambient);
          wire_events(doc, node, self.scope, ambient);
        }
        _ => {}
      }
    }
    true
  }

  fn expand_repeat(
    &mut self,
    doc: &mut Document,
    template: NodeId,
    ambient: &Bindings,
  ) -> Vec<NodeId> {
    let src = doc.remove_attr(template, NG_FOR).and_then(|a| a.value).unwrap_or_default();
    let Some(spec) = RepeatSpec::parse(&src) else {
      tracing::warn!(expr = %truncate(&src, 60), "malformed repeat expression, dropping element");
      doc.replace_with(template, &[]);
      return Vec::new();
    };

    let items = match self.ctx.evaluate(&spec.iterable, ambient) {
      Ok(Value::Array(items)) => items,
      Ok(Value::Null) => Vec::new(),
      Ok(other) => {
        tracing::warn!(
          iterable = %spec.iterable,
          value = %truncate(&other.to_string(), 60),
          "repeat source is not an array"
        );
        Vec::new()
      }
      Err(e) => {
        tracing::warn!(iterable = %spec.iterable, error = %e, "repeat source failed to evaluate");
        Vec::new()
      }
    };

    let mut clones = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
      let clone = doc.clone_subtree(template);
      doc.set_attr(clone, INDEX_ATTR, Some(i.to_string()));
      let mut bindings = ambient.clone();
      bindings.insert(spec.item.clone(), item);
      if let Some(index) = &spec.index {
        bindings.insert(index.clone(), Value::from(i));
      }
      if self.process_scope(doc, clone, true, &bindings) {
        clones.push(clone);
      }
    }
    doc.replace_with(template, &clones);
    clones
  }

  fn condition(&mut self, doc: &mut Document, node: NodeId, ambient: &Bindings) -> bool {
    let src = doc.remove_attr(node, NG_IF).and_then(|a| a.value).unwrap_or_default();
    // `cond; else tpl` keeps only the condition
    let cond = src.split(';').next().unwrap_or_default();
    match self.ctx.evaluate(cond, ambient) {
      Ok(value) => is_truthy(&value),
      Err(e) => {
        tracing::warn!(expr = %truncate(cond, 60), error = %e, "condition failed, hiding element");
        false
      }
    }
  }

  fn render_expr(&mut self, src: &str, ambient: &Bindings) -> String {
    let expr = decode_entities(src.trim());
    match self.ctx.evaluate(&expr, ambient) {
      Ok(value) => stringify(&value),
      Err(e) => {
        tracing::debug!(expr = %truncate(&expr, 60), error = %e, "interpolation failed");
        String::new()
      }
    }
  }

  fn interpolate_text(&mut self, doc: &mut Document, node: NodeId, ambient: &Bindings) {
    if doc.parent(node).and_then(|p| doc.tag(p)).is_some_and(is_raw_text_element) {
      return;
    }
    let Some(text) = doc.text(node) else { return };
    if !text.contains("{{") {
      return;
    }
    let text = text.to_string();
    let rendered = self.replace_interpolations(&text, ambient, true);
    doc.set_text(node, rendered);
  }

  fn interpolate_attrs(&mut self, doc: &mut Document, node: NodeId, ambient: &Bindings) {
    let targets: Vec<(String, String)> = doc
      .attrs(node)
      .iter()
      .filter(|a| !is_directive_attr(&a.name) && !doc.is_attr_inert(node, &a.name))
      .filter_map(|a| {
        let value = a.value.as_ref().filter(|v| v.contains("{{"))?;
        Some((a.name.clone(), value.clone()))
      })
      .collect();
    for (name, value) in targets {
      let rendered = self.replace_interpolations(&value, ambient, false);
      set_evaluated_attr(doc, node, &name, Some(rendered));
    }
  }

  fn replace_interpolations(&mut self, input: &str, ambient: &Bindings, escape: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in interpolation_re().captures_iter(input) {
      let Some(whole) = caps.get(0) else { continue };
      out.push_str(&input[last..whole.start()]);
      let value = self.render_expr(caps.get(1).map_or("", |m| m.as_str()), ambient);
      out.push_str(&if escape { escape_text(&value) } else { value });
      last = whole.end();
    }
    out.push_str(&input[last..]);
    out
  }

  fn apply_bindings(&mut self, doc: &mut Document, node: NodeId, ambient: &Bindings) {
    let bound: Vec<String> = doc
      .attrs(node)
      .iter()
      .filter(|a| a.name.len() > 2 && a.name.starts_with('[') && a.name.ends_with(']'))
      .map(|a| a.name.clone())
      .collect();
    for attr_name in bound {
      let src = doc.remove_attr(node, &attr_name).and_then(|a| a.value).unwrap_or_default();
      let target = &attr_name[1..attr_name.len() - 1];
      match self.ctx.evaluate(&src, ambient) {
        Ok(value) => apply_property(doc, node, target, &value),
        Err(e) => {
          tracing::warn!(
            binding = %target,
            expr = %truncate(&src, 60),
            error = %e,
            "property binding failed"
          );
        }
      }
    }
  }
}

fn is_directive_attr(name: &str) -> bool {
  name.starts_with('*') || name.starts_with('[') || name.starts_with('(')
}

/// Whether `node` is still inside `root` (or is `root`).
fn within(doc: &Document, node: NodeId, root: NodeId) -> bool {
  node == root || doc.ancestors(node).any(|a| a == root)
}

/// Preorder walk of `root` collecting nodes that satisfy `pred`. Nodes in
/// `skip` and inert data subtrees are not entered. Component hosts and repeat templates are
/// collected but not descended into.
fn collect(
  doc: &Document,
  root: NodeId,
  include_root: bool,
  skip: &[NodeId],
  pred: impl Fn(&Document, NodeId) -> bool,
) -> Vec<NodeId> {
  let mut out = Vec::new();
  let mut stack: Vec<NodeId> =
    if include_root { vec![root] } else { doc.children(root).iter().rev().copied().collect() };
  while let Some(node) = stack.pop() {
    if skip.contains(&node) || doc.is_inert(node) {
      continue;
    }
    if pred(doc, node) {
      out.push(node);
    }
    let boundary = doc.has_attr(node, HOST_INSTANCE_ATTR) || doc.has_attr(node, NG_FOR);
    if node != root && boundary {
      continue;
    }
    stack.extend(doc.children(node).iter().rev().copied());
  }
  out
}

/// Apply one evaluated `[target]` binding to an element.
pub fn apply_property(doc: &mut Document, node: NodeId, target: &str, value: &Value) {
  if let Some(class) = target.strip_prefix("class.") {
    toggle_class(doc, node, class, is_truthy(value));
    return;
  }
  if let Some(rest) = target.strip_prefix("style.") {
    let (prop, unit) = rest.split_once('.').unwrap_or((rest, ""));
    let rendered = match value {
      Value::Null => None,
      Value::String(s) if s.is_empty() => None,
      Value::Bool(false) => None,
      v => Some(format!("{}{unit}", stringify(v))),
    };
    set_style(doc, node, prop, rendered);
    return;
  }
  if let Some(attr) = target.strip_prefix("attr.") {
    match value {
      Value::Null | Value::Bool(false) => {
        doc.remove_attr(node, attr);
      }
      v => set_evaluated_attr(doc, node, attr, Some(stringify(v))),
    }
    return;
  }

  match target {
    "class" | "className" | "ngClass" => match value {
      Value::Object(map) => {
        for (names, on) in map {
          for name in names.split_whitespace() {
            toggle_class(doc, node, name, is_truthy(on));
          }
        }
      }
      Value::Array(items) => {
        for item in items {
          toggle_class(doc, node, &stringify(item), true);
        }
      }
      v => {
        for name in stringify(v).split_whitespace() {
          toggle_class(doc, node, name, true);
        }
      }
    },
    "style" | "ngStyle" => match value {
      Value::Object(map) => {
        for (prop, v) in map {
          let (prop, unit) = prop.split_once('.').unwrap_or((prop, ""));
          let empty = v.is_null() || v.as_str().is_some_and(str::is_empty);
          let rendered = (!empty).then(|| format!("{}{unit}", stringify(v)));
          set_style(doc, node, prop, rendered);
        }
      }
      Value::Null => {}
      v => {
        for (prop, val) in parse_style(&stringify(v)) {
          set_style(doc, node, &prop, Some(val));
        }
      }
    },
    "innerHTML" | "innerHtml" => {
      doc.clear_children(node);
      for added in doc.append_html(node, &stringify(value)) {
        doc.mark_inert(added);
      }
    }
    "textContent" | "innerText" => {
      doc.clear_children(node);
      let text = doc.create_text(&escape_text(&stringify(value)));
      doc.mark_inert(text);
      doc.append_child(node, text);
    }
    name if is_html_boolean_attr(name) => {
      if is_truthy(value) {
        set_evaluated_attr(doc, node, name, Some(String::new()));
      } else {
        doc.remove_attr(node, name);
      }
    }
    name => match value {
      Value::Null => {
        doc.remove_attr(node, name);
      }
      v => set_evaluated_attr(doc, node, name, Some(stringify(v))),
    },
  }
}

/// Escape evaluated output for a text node. Braces are encoded too so the
/// output never reads as an interpolation on a later pass.
fn escape_text(value: &str) -> String {
  escape_html(value).replace('{', "&#123;")
}

fn set_evaluated_attr(doc: &mut Document, node: NodeId, name: &str, value: Option<String>) {
  doc.set_attr(node, name, value);
  doc.mark_attr_inert(node, name);
}

fn toggle_class(doc: &mut Document, node: NodeId, class: &str, on: bool) {
  if class.is_empty() {
    return;
  }
  let mut classes: Vec<String> =
    doc.attr(node, "class").unwrap_or_default().split_whitespace().map(String::from).collect();
  let present = classes.iter().any(|c| c == class);
  match (on, present) {
    (true, false) => classes.push(class.to_string()),
    (false, true) => classes.retain(|c| c != class),
    _ => return,
  }
  if classes.is_empty() {
    doc.remove_attr(node, "class");
  } else {
    set_evaluated_attr(doc, node, "class", Some(classes.join(" ")));
  }
}

fn parse_style(style: &str) -> Vec<(String, String)> {
  style
    .split(';')
    .filter_map(|decl| {
      let (prop, value) = decl.split_once(':')?;
      let prop = prop.trim();
      (!prop.is_empty()).then(|| (prop.to_string(), value.trim().to_string()))
    })
    .collect()
}

fn set_style(doc: &mut Document, node: NodeId, prop: &str, value: Option<String>) {
  let mut decls = parse_style(doc.attr(node, "style").unwrap_or_default());
  let pos = decls.iter().position(|(p, _)| p.eq_ignore_ascii_case(prop));
  match (value, pos) {
    (Some(v), Some(i)) => decls[i].1 = v,
    (Some(v), None) => decls.push((prop.to_string(), v)),
    (None, Some(i)) => {
      decls.remove(i);
    }
    (None, None) => return,
  }
  if decls.is_empty() {
    doc.remove_attr(node, "style");
  } else {
    let style = decls.iter().map(|(p, v)| format!("{p}: {v}")).collect::<Vec<_>>().join("; ");
    set_evaluated_attr(doc, node, "style", Some(style));
  }
}
