/* src/render/script/rust/src/context.rs */

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::ast::{Expr, Stmt};
use crate::descriptor::{LifecycleHook, ScriptDescriptor};
use crate::errors::{EvalResult, ScriptError};
use crate::eval::{Bindings, MethodTable, Scope, ScriptFn};
use crate::parser::{parse_expression, parse_statements};

/// Shared dirty flag plus a counter of completed change-detection passes.
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
  dirty: Arc<AtomicBool>,
  passes: Arc<AtomicU64>,
}

impl ChangeDetector {
  pub fn mark_for_check(&self) {
    self.dirty.store(true, Ordering::Release);
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty.load(Ordering::Acquire)
  }

  /// Record a completed pass; returns whether a check had been requested.
  pub fn detect_changes(&self) -> bool {
    self.passes.fetch_add(1, Ordering::AcqRel);
    self.dirty.swap(false, Ordering::AcqRel)
  }

  pub fn passes(&self) -> u64 {
    self.passes.load(Ordering::Acquire)
  }
}

fn compile(params: Vec<String>, body: Vec<Stmt>) -> ScriptFn {
  Arc::new(move |scope: &mut Scope<'_>, args: Vec<Value>| scope.invoke(&params, &body, args))
}

/// Live state of one page or component script: properties, callable methods
/// and lifecycle hooks.
#[derive(Default)]
pub struct PageScriptContext {
  properties: Map<String, Value>,
  methods: MethodTable,
  on_init: Option<ScriptFn>,
  on_destroy: Option<ScriptFn>,
  change_detector: ChangeDetector,
}

impl PageScriptContext {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn from_descriptor(desc: &ScriptDescriptor) -> Self {
    let mut ctx = Self::empty();
    ctx.properties.extend(desc.properties());
    for (name, params, body) in desc.methods() {
      ctx.methods.insert(name.to_string(), compile(params.to_vec(), body.to_vec()));
    }
    let hook = |h: LifecycleHook| desc.hook(h).map(|body| compile(Vec::new(), body.to_vec()));
    ctx.on_init = hook(LifecycleHook::Init);
    ctx.on_destroy = hook(LifecycleHook::Destroy);
    ctx
  }

  /// Overlay values onto the property set; incoming keys win.
  pub fn merge_properties(&mut self, values: &Map<String, Value>) {
    for (key, value) in values {
      self.properties.insert(key.clone(), value.clone());
    }
  }

  pub fn property(&self, name: &str) -> Option<&Value> {
    self.properties.get(name)
  }

  pub fn set_property(&mut self, name: &str, value: Value) {
    self.properties.insert(name.to_string(), value);
    self.change_detector.mark_for_check();
  }

  pub fn properties(&self) -> &Map<String, Value> {
    &self.properties
  }

  pub fn has_method(&self, name: &str) -> bool {
    self.methods.contains_key(name)
  }

  pub fn method_names(&self) -> impl Iterator<Item = &str> {
    self.methods.keys().map(String::as_str)
  }

  pub fn register_method(&mut self, name: &str, method: ScriptFn) {
    self.methods.insert(name.to_string(), method);
  }

  pub fn has_hook(&self, hook: LifecycleHook) -> bool {
    match hook {
      LifecycleHook::Init => self.on_init.is_some(),
      LifecycleHook::Destroy => self.on_destroy.is_some(),
    }
  }

  /// Invoke a named method. A missing method is reported as
  /// [`ScriptError::UndefinedName`] so callers can treat it as a normal outcome.
  pub fn call(&mut self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    if !self.has_method(name) {
      return Err(ScriptError::UndefinedName(name.to_string()));
    }
    let result = Scope::new(&mut self.properties, &self.methods).call_method(name, args);
    self.change_detector.mark_for_check();
    result
  }

  /// Parse and evaluate a single expression with optional ambient bindings.
  pub fn evaluate(&mut self, src: &str, ambient: &Bindings) -> EvalResult<Value> {
    let expr = parse_expression(src)?;
    self.evaluate_expr(&expr, ambient)
  }

  pub fn evaluate_expr(&mut self, expr: &Expr, ambient: &Bindings) -> EvalResult<Value> {
    Scope::with_bindings(&mut self.properties, &self.methods, ambient.clone()).eval(expr)
  }

  /// Run a statement list (inline handler code) against the context.
  pub fn execute(&mut self, src: &str, ambient: &Bindings) -> EvalResult<Value> {
    let body = parse_statements(src)?;
    let mut scope = Scope::with_bindings(&mut self.properties, &self.methods, ambient.clone());
    let result = scope.invoke(&[], &body, Vec::new());
    self.change_detector.mark_for_check();
    result
  }

  pub fn run_on_init(&mut self) -> EvalResult<()> {
    let Some(hook) = self.on_init.clone() else { return Ok(()) };
    let mut scope = Scope::new(&mut self.properties, &self.methods);
    hook(&mut scope, Vec::new())?;
    self.change_detector.mark_for_check();
    Ok(())
  }

  /// Run the destroy hook. The hook is consumed, so a second call is a no-op.
  pub fn run_on_destroy(&mut self) -> EvalResult<()> {
    let Some(hook) = self.on_destroy.take() else { return Ok(()) };
    let mut scope = Scope::new(&mut self.properties, &self.methods);
    hook(&mut scope, Vec::new())?;
    Ok(())
  }

  pub fn change_detector(&self) -> &ChangeDetector {
    &self.change_detector
  }
}

impl fmt::Debug for PageScriptContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PageScriptContext")
      .field("properties", &self.properties)
      .field("methods", &self.methods.keys().collect::<Vec<_>>())
      .field("on_init", &self.on_init.is_some())
      .field("on_destroy", &self.on_destroy.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::descriptor::parse_script;
  use serde_json::json;

  fn ctx(src: &str) -> PageScriptContext {
    PageScriptContext::from_descriptor(&parse_script(src))
  }

  #[test]
  fn properties_from_script() {
    let c = ctx("greeting: 'hi'; count: 3; isOn: true;");
    assert_eq!(c.property("greeting"), Some(&json!("hi")));
    assert_eq!(c.property("count"), Some(&json!(3)));
    assert_eq!(c.property("isOn"), Some(&json!(true)));
  }

  #[test]
  fn on_init_runs_without_error() {
    let mut c = ctx("function onInit() { ran = true; }");
    c.run_on_init().unwrap();
    assert_eq!(c.property("ran"), Some(&json!(true)));
  }

  #[test]
  fn on_destroy_runs_once() {
    let mut c = ctx("closed: 0; function onDestroy() { closed++; }");
    c.run_on_destroy().unwrap();
    c.run_on_destroy().unwrap();
    assert_eq!(c.property("closed"), Some(&json!(1)));
    assert!(!c.has_hook(LifecycleHook::Destroy));
  }

  #[test]
  fn method_call_updates_state_and_marks_dirty() {
    let mut c = ctx("count: 0; add(n) { this.count += n; return this.count; }");
    assert!(!c.change_detector().is_dirty());
    assert_eq!(c.call("add", vec![json!(5)]).unwrap(), json!(5));
    assert_eq!(c.property("count"), Some(&json!(5)));
    assert!(c.change_detector().detect_changes());
    assert!(!c.change_detector().is_dirty());
    assert_eq!(c.change_detector().passes(), 1);
  }

  #[test]
  fn missing_method_is_undefined_name() {
    let mut c = ctx("a: 1;");
    assert_eq!(c.call("nope", Vec::new()), Err(ScriptError::UndefinedName("nope".into())));
  }

  #[test]
  fn methods_call_each_other() {
    let mut c = ctx("n: 1; double() { n = n * 2 } quad() { this.double(); double(); }");
    c.call("quad", Vec::new()).unwrap();
    assert_eq!(c.property("n"), Some(&json!(4)));
  }

  #[test]
  fn evaluate_with_ambient() {
    let mut c = ctx("prefix: '#';");
    let mut ambient = Bindings::new();
    ambient.insert("i".into(), json!(2));
    assert_eq!(c.evaluate("prefix + (i + 1)", &ambient).unwrap(), json!("#3"));
    assert!(c.evaluate("missing", &Bindings::new()).is_err());
  }

  #[test]
  fn execute_inline_statements() {
    let mut c = ctx("count: 1;");
    c.execute("count = count + 1", &Bindings::new()).unwrap();
    assert_eq!(c.property("count"), Some(&json!(2)));
    assert!(c.change_detector().is_dirty());
  }

  #[test]
  fn merge_prefers_incoming_values() {
    let mut c = ctx("heading: 'Default'; size: 1;");
    let data = json!({"heading": "From data"});
    c.merge_properties(data.as_object().unwrap());
    assert_eq!(c.property("heading"), Some(&json!("From data")));
    assert_eq!(c.property("size"), Some(&json!(1)));
  }

  #[test]
  fn garbage_script_gives_empty_context() {
    let c = ctx("<<< not a script >>>");
    assert!(c.properties().is_empty());
    assert_eq!(c.method_names().count(), 0);
  }

  #[test]
  fn failing_hook_reports_error() {
    let mut c = ctx("function onInit() { throw 'nope'; }");
    assert_eq!(c.run_on_init(), Err(ScriptError::Thrown("nope".into())));
  }
}
