/* src/render/engine/rust/src/session.rs */

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use cms_api::PageId;
use cms_script::{PageScriptContext, ScriptDescriptor};

use crate::helpers::escape_attr;
use crate::mount::page_style_key;

/// Document-level state owned by one viewer: injected style blocks keyed by
/// owner, and the live script context of each activated page.
///
/// Re-activating a page replaces its style block and context instead of
/// stacking a second copy; the previous context's destroy hook runs first.
#[derive(Debug, Default)]
pub struct RenderSession {
  styles: BTreeMap<String, String>,
  contexts: BTreeMap<PageId, PageScriptContext>,
}

impl RenderSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Install a page's CSS and script, running the script's init hook.
  pub fn activate(
    &mut self,
    page_id: PageId,
    css: &str,
    descriptor: &ScriptDescriptor,
  ) -> &mut PageScriptContext {
    self.activate_context(page_id, css, PageScriptContext::from_descriptor(descriptor))
  }

  /// Like [`activate`](Self::activate) with a context the caller prepared,
  /// e.g. one carrying host-provided methods.
  pub fn activate_context(
    &mut self,
    page_id: PageId,
    css: &str,
    mut ctx: PageScriptContext,
  ) -> &mut PageScriptContext {
    self.deactivate(page_id);
    if !css.trim().is_empty() {
      self.inject_style(&page_style_key(page_id), css);
    }
    if let Err(e) = ctx.run_on_init() {
      tracing::warn!(page_id, error = %e, "page init hook failed");
    }
    tracing::debug!(page_id, methods = ctx.method_names().count(), "page script activated");
    match self.contexts.entry(page_id) {
      Entry::Occupied(mut slot) => {
        slot.insert(ctx);
        slot.into_mut()
      }
      Entry::Vacant(slot) => slot.insert(ctx),
    }
  }

  /// Remove a page's style block and tear down its context. Returns whether
  /// a context was active.
  pub fn deactivate(&mut self, page_id: PageId) -> bool {
    self.remove_style(&page_style_key(page_id));
    let Some(mut ctx) = self.contexts.remove(&page_id) else { return false };
    if let Err(e) = ctx.run_on_destroy() {
      tracing::error!(page_id, error = %e, "page destroy hook failed");
    }
    tracing::debug!(page_id, "page script deactivated");
    true
  }

  /// Tear down every active page and drop all injected styles.
  pub fn teardown_all(&mut self) {
    let pages: Vec<PageId> = self.contexts.keys().copied().collect();
    for page_id in pages {
      self.deactivate(page_id);
    }
    self.styles.clear();
  }

  pub fn context(&self, page_id: PageId) -> Option<&PageScriptContext> {
    self.contexts.get(&page_id)
  }

  pub fn context_mut(&mut self, page_id: PageId) -> Option<&mut PageScriptContext> {
    self.contexts.get_mut(&page_id)
  }

  pub fn active_pages(&self) -> impl Iterator<Item = PageId> + '_ {
    self.contexts.keys().copied()
  }

  /// Insert or replace the style block for `key`.
  pub fn inject_style(&mut self, key: &str, css: &str) {
    self.styles.insert(key.to_string(), css.to_string());
  }

  pub fn remove_style(&mut self, key: &str) -> bool {
    self.styles.remove(key).is_some()
  }

  pub fn style(&self, key: &str) -> Option<&str> {
    self.styles.get(key).map(String::as_str)
  }

  pub fn style_keys(&self) -> impl Iterator<Item = &str> {
    self.styles.keys().map(String::as_str)
  }

  /// One `<style>` element per key, in key order.
  pub fn render_head(&self) -> String {
    let mut out = String::new();
    for (key, css) in &self.styles {
      out.push_str(r#"<style data-style-key=""#);
      out.push_str(&escape_attr(key));
      out.push_str(r#"">"#);
      // CSS can't close its own element
      out.push_str(&css.replace("</style", r"<\/style"));
      out.push_str("</style>");
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use cms_script::{Scope, ScriptFn, parse_script};
  use serde_json::{Value, json};

  fn counter() -> (Arc<AtomicUsize>, ScriptFn) {
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    let f: ScriptFn = Arc::new(move |_scope: &mut Scope<'_>, _args: Vec<Value>| {
      hits.fetch_add(1, Ordering::SeqCst);
      Ok(Value::Null)
    });
    (count, f)
  }

  fn context_with_destroy_counter(script: &str) -> (Arc<AtomicUsize>, PageScriptContext) {
    let (count, f) = counter();
    let mut ctx = PageScriptContext::from_descriptor(&parse_script(script));
    ctx.register_method("record", f);
    (count, ctx)
  }

  #[test]
  fn activate_injects_one_style_per_page() {
    let mut session = RenderSession::new();
    session.activate(7, "h1 { color: red; }", &parse_script(""));
    session.activate(7, "h1 { color: blue; }", &parse_script(""));
    assert_eq!(session.style_keys().collect::<Vec<_>>(), vec!["page:7"]);
    assert_eq!(
      session.render_head(),
      r#"<style data-style-key="page:7">h1 { color: blue; }</style>"#
    );
  }

  #[test]
  fn activate_runs_init() {
    let mut session = RenderSession::new();
    let ctx = session.activate(1, "", &parse_script("n = 0; onInit() { this.n = 5; }"));
    assert_eq!(ctx.property("n"), Some(&json!(5)));
    assert!(session.style_keys().next().is_none());
  }

  #[test]
  fn deactivate_runs_destroy_once() {
    let mut session = RenderSession::new();
    let (count, ctx) = context_with_destroy_counter("onDestroy() { record(); }");
    session.activate_context(7, "p {}", ctx);
    assert!(session.deactivate(7));
    assert!(!session.deactivate(7));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(session.style("page:7").is_none());
    assert!(session.context(7).is_none());
  }

  #[test]
  fn reactivation_destroys_previous_context() {
    let mut session = RenderSession::new();
    let (first, ctx) = context_with_destroy_counter("onDestroy() { record(); }");
    session.activate_context(7, "", ctx);
    let (second, ctx) = context_with_destroy_counter("onDestroy() { record(); }");
    session.activate_context(7, "", ctx);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
    session.teardown_all();
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn teardown_clears_everything() {
    let mut session = RenderSession::new();
    session.activate(1, "a {}", &parse_script(""));
    session.inject_style("component:9", "b {}");
    session.teardown_all();
    assert_eq!(session.active_pages().count(), 0);
    assert!(session.render_head().is_empty());
  }

  #[test]
  fn style_cannot_break_out() {
    let mut session = RenderSession::new();
    session.inject_style("component:1", "</style><script>x</script>");
    assert!(!session.render_head().contains("</style><script>"));
  }
}
