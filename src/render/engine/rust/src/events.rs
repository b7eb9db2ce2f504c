/* src/render/engine/rust/src/events.rs */

use cms_script::ast::Expr;
use cms_script::helpers::truncate;
use cms_script::{Bindings, PageScriptContext, parse_expression};
use serde_json::{Map, Value};

use crate::dom::{Document, NodeId};

/// Which script context a listener dispatches into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
  Page,
  /// A mounted component, by instance id.
  Component(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerArg {
  /// `index` / `i`: the repeat index recorded on the element.
  Index,
  /// `$event`: the dispatched event object.
  Event,
  Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
  /// `name` or `name(args)`: a method on the owning context.
  Call { method: String, args: Vec<HandlerArg> },
  /// Any other handler text, run as statements.
  Statements(String),
}

impl Handler {
  pub fn parse(src: &str) -> Self {
    let trimmed = src.trim().trim_end_matches(';').trim();
    let Ok(expr) = parse_expression(trimmed) else {
      return Self::Statements(src.to_string());
    };
    match expr {
      Expr::Ident(method) => Self::Call { method, args: Vec::new() },
      Expr::Call { callee, args, .. } => match method_name(&callee) {
        Some(method) => Self::Call { method, args: args.into_iter().map(handler_arg).collect() },
        None => Self::Statements(src.to_string()),
      },
      _ => Self::Statements(src.to_string()),
    }
  }
}

fn method_name(callee: &Expr) -> Option<String> {
  match callee {
    Expr::Ident(name) => Some(name.clone()),
    Expr::Member { object, property, .. } if matches!(**object, Expr::This) => {
      Some(property.clone())
    }
    _ => None,
  }
}

fn handler_arg(expr: Expr) -> HandlerArg {
  match &expr {
    Expr::Ident(name) if name == "index" || name == "i" => HandlerArg::Index,
    Expr::Ident(name) if name == "$event" => HandlerArg::Event,
    _ => HandlerArg::Expr(expr),
  }
}

/// An event binding captured from a `(event)="handler"` attribute.
#[derive(Debug, Clone)]
pub struct Listener {
  pub node: NodeId,
  pub event: String,
  pub handler: Handler,
  pub scope: ListenerScope,
  /// Repeat bindings in effect where the element was rendered.
  pub ambient: Bindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
  Handled,
  /// A listener matched but named a method the context does not define.
  MissingHandler,
  NoListener,
}

/// Strip every `(event)` attribute from `node` and register a listener for it.
pub fn wire_events(
  doc: &mut Document,
  node: NodeId,
  scope: ListenerScope,
  ambient: &Bindings,
) -> usize {
  let bindings: Vec<(String, String)> = doc
    .attrs(node)
    .iter()
    .filter_map(|a| {
      let event = a.name.strip_prefix('(')?.strip_suffix(')')?;
      (!event.is_empty()).then(|| (a.name.clone(), event.to_ascii_lowercase()))
    })
    .collect();

  for (attr_name, event) in &bindings {
    let src = doc.remove_attr(node, attr_name).and_then(|a| a.value).unwrap_or_default();
    let handler = Handler::parse(&src);
    tracing::trace!(node = %node, event = %event, handler = %truncate(&src, 60), "wired listener");
    doc.add_listener(Listener {
      node,
      event: event.clone(),
      handler,
      scope,
      ambient: ambient.clone(),
    });
  }
  bindings.len()
}

/// Listeners that fire for `event` dispatched at `target`, innermost first.
pub fn listeners_for(doc: &Document, target: NodeId, event: &str) -> Vec<Listener> {
  let path: Vec<NodeId> = std::iter::once(target).chain(doc.ancestors(target)).collect();
  let mut found = Vec::new();
  for node in path {
    found.extend(
      doc
        .listeners()
        .iter()
        .filter(|l| l.node == node && l.event.eq_ignore_ascii_case(event))
        .cloned(),
    );
  }
  found
}

/// The repeat index of the nearest repeated element at or above `node`.
pub fn repeat_index(doc: &Document, node: NodeId) -> Option<u64> {
  std::iter::once(node)
    .chain(doc.ancestors(node))
    .find_map(|n| doc.attr(n, "data-index"))
    .and_then(|raw| raw.parse().ok())
}

/// Build the `$event` object handed to handlers.
pub fn event_object(doc: &Document, target: NodeId, event: &str, payload: &Value) -> Value {
  let mut target_obj = Map::new();
  let tag_name = doc.tag(target).unwrap_or_default().to_ascii_uppercase();
  target_obj.insert("tagName".into(), Value::from(tag_name));
  target_obj.insert("value".into(), Value::from(doc.attr(target, "value").unwrap_or_default()));
  target_obj.insert("checked".into(), Value::Bool(doc.has_attr(target, "checked")));
  if let Some(id) = doc.attr(target, "id") {
    target_obj.insert("id".into(), Value::from(id));
  }

  let mut obj = Map::new();
  obj.insert("type".into(), Value::from(event));
  if let Value::Object(extra) = payload {
    for key in ["value", "checked"] {
      if let Some(v) = extra.get(key) {
        target_obj.insert(key.into(), v.clone());
      }
    }
    for (key, value) in extra {
      obj.insert(key.clone(), value.clone());
    }
  }
  obj.insert("target".into(), Value::Object(target_obj));
  Value::Object(obj)
}

/// Run one listener against its context.
pub fn invoke(
  ctx: &mut PageScriptContext,
  doc: &Document,
  listener: &Listener,
  event: &Value,
) -> DispatchOutcome {
  let index = repeat_index(doc, listener.node);
  let mut ambient = listener.ambient.clone();
  ambient.insert("$event".into(), event.clone());
  if let Some(index) = index {
    ambient.entry("index").or_insert(Value::from(index));
  }

  match &listener.handler {
    Handler::Call { method, args } => {
      if !ctx.has_method(method) {
        tracing::warn!(method = %method, event = %listener.event, "event handler not defined");
        return DispatchOutcome::MissingHandler;
      }
      let values = args
        .iter()
        .map(|arg| match arg {
          HandlerArg::Index => index.map_or(Value::Null, Value::from),
          HandlerArg::Event => event.clone(),
          HandlerArg::Expr(expr) => ctx.evaluate_expr(expr, &ambient).unwrap_or_else(|e| {
            tracing::warn!(method = %method, error = %e, "handler argument failed, passing null");
            Value::Null
          }),
        })
        .collect();
      if let Err(e) = ctx.call(method, values) {
        tracing::warn!(method = %method, error = %e, "event handler failed");
      }
      DispatchOutcome::Handled
    }
    Handler::Statements(src) => {
      if let Err(e) = ctx.execute(src, &ambient) {
        tracing::warn!(handler = %truncate(src, 60), error = %e, "inline handler failed");
      }
      DispatchOutcome::Handled
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cms_script::parse_script;
  use serde_json::json;

  fn ctx(src: &str) -> PageScriptContext {
    PageScriptContext::from_descriptor(&parse_script(src))
  }

  fn first_element(doc: &Document) -> NodeId {
    doc.children(doc.root())[0]
  }

  #[test]
  fn parse_handler_forms() {
    assert_eq!(Handler::parse("save"), Handler::Call { method: "save".into(), args: vec![] });
    assert!(matches!(
      Handler::parse("select(i, $event, 'x')"),
      Handler::Call { ref method, ref args } if method == "select"
        && matches!(args[0], HandlerArg::Index)
        && matches!(args[1], HandlerArg::Event)
        && matches!(args[2], HandlerArg::Expr(_))
    ));
    assert!(matches!(Handler::parse("this.toggle()"), Handler::Call { ref method, .. } if method == "toggle"));
    assert!(matches!(Handler::parse("count = count + 1"), Handler::Statements(_)));
    assert!(matches!(Handler::parse("a = 1; b = 2"), Handler::Statements(_)));
  }

  #[test]
  fn wiring_strips_attributes() {
    let mut doc = Document::parse(r#"<button (click)="go()" (mouseEnter)="hover()">x</button>"#);
    let button = first_element(&doc);
    assert_eq!(wire_events(&mut doc, button, ListenerScope::Page, &Bindings::new()), 2);
    assert_eq!(doc.outer_html(button), "<button>x</button>");
    assert_eq!(doc.listeners().len(), 2);
    assert_eq!(doc.listeners()[1].event, "mouseenter");
  }

  #[test]
  fn listeners_bubble_innermost_first() {
    let mut doc = Document::parse(r#"<div (click)="outer()"><span (click)="inner()">x</span></div>"#);
    let div = first_element(&doc);
    let span = doc.children(div)[0];
    wire_events(&mut doc, div, ListenerScope::Page, &Bindings::new());
    wire_events(&mut doc, span, ListenerScope::Page, &Bindings::new());
    let found = listeners_for(&doc, span, "click");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].node, span);
    assert!(listeners_for(&doc, span, "keyup").is_empty());
  }

  #[test]
  fn index_argument_comes_from_element() {
    let mut doc = Document::parse(r#"<li data-index="2"><a (click)="pick(i)">x</a></li>"#);
    let li = first_element(&doc);
    let a = doc.children(li)[0];
    wire_events(&mut doc, a, ListenerScope::Page, &Bindings::new());
    let mut context = ctx("picked = 0; pick(n) { this.picked = n; }");
    let listener = doc.listeners()[0].clone();
    let outcome = invoke(&mut context, &doc, &listener, &json!({}));
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(context.property("picked"), Some(&json!(2)));
  }

  #[test]
  fn missing_method_is_reported() {
    let mut doc = Document::parse(r#"<button (click)="nothing()">x</button>"#);
    let button = first_element(&doc);
    wire_events(&mut doc, button, ListenerScope::Page, &Bindings::new());
    let mut context = ctx("");
    let listener = doc.listeners()[0].clone();
    assert_eq!(invoke(&mut context, &doc, &listener, &Value::Null), DispatchOutcome::MissingHandler);
  }

  #[test]
  fn inline_statements_see_event_and_ambient() {
    let mut doc = Document::parse(r#"<input (input)="query = $event.target.value + suffix">"#);
    let input = first_element(&doc);
    let mut ambient = Bindings::new();
    ambient.insert("suffix".into(), json!("!"));
    wire_events(&mut doc, input, ListenerScope::Page, &ambient);
    let mut context = ctx("query = '';");
    let listener = doc.listeners()[0].clone();
    let event = event_object(&doc, input, "input", &json!({"value": "abc"}));
    assert_eq!(invoke(&mut context, &doc, &listener, &event), DispatchOutcome::Handled);
    assert_eq!(context.property("query"), Some(&json!("abc!")));
  }

  #[test]
  fn event_object_shape() {
    let doc = Document::parse(r#"<input id="q" value="v" checked>"#);
    let input = first_element(&doc);
    let event = event_object(&doc, input, "change", &Value::Null);
    assert_eq!(event["type"], json!("change"));
    assert_eq!(event["target"]["tagName"], json!("INPUT"));
    assert_eq!(event["target"]["value"], json!("v"));
    assert_eq!(event["target"]["checked"], json!(true));
    assert_eq!(event["target"]["id"], json!("q"));
  }
}
