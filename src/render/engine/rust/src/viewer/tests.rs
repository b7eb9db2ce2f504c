/* src/render/engine/rust/src/viewer/tests.rs */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use cms_api::{ApiError, ComponentDefinition, MemoryContentSource};
use cms_script::Scope;
use serde_json::json;

fn page(id: PageId, html: &str, javascript: &str) -> PageDefinition {
  PageDefinition {
    id,
    name: format!("Page {id}"),
    site_id: 1,
    html: html.into(),
    javascript: javascript.into(),
    ..Default::default()
  }
}

fn component(id: ComponentId, template: &str, javascript: &str) -> ComponentDefinition {
  ComponentDefinition {
    id,
    name: format!("Component {id}"),
    template: template.into(),
    javascript: javascript.into(),
    ..Default::default()
  }
}

fn counter() -> (Arc<AtomicUsize>, ScriptFn) {
  let count = Arc::new(AtomicUsize::new(0));
  let hits = count.clone();
  let f: ScriptFn = Arc::new(move |_scope: &mut Scope<'_>, _args: Vec<Value>| {
    hits.fetch_add(1, Ordering::SeqCst);
    Ok(Value::Null)
  });
  (count, f)
}

fn first(viewer: &PageViewer, tag: &str) -> NodeId {
  let doc = viewer.document();
  doc.elements_by_tag(doc.root(), tag)[0]
}

const WELCOME_HTML: &str =
  r#"<div>{{title}}</div><app-component-viewer componentId="42"></app-component-viewer>"#;

#[tokio::test]
async fn page_renders_and_mounts_components() {
  let source = MemoryContentSource::new()
    .page(page(1, WELCOME_HTML, "title: 'Welcome';"))
    .component(component(42, "<p>{{ label }}</p>", "label = 'card';"));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();

  assert!(viewer.html().starts_with("<div>Welcome</div>"));
  let states = viewer.component_states();
  assert_eq!(states.len(), 1);
  assert_eq!(states[0].component_id, 42);
  assert_eq!(states[0].state, RenderState::Loading);
  assert!(viewer.html().contains(r#"data-state="loading""#));

  assert_eq!(viewer.resolve_components(&source).await, 1);
  assert_eq!(viewer.component_states()[0].state, RenderState::Loaded);
  assert_eq!(
    viewer.html(),
    concat!(
      "<div>Welcome</div>",
      r#"<div class="component-host" data-component-id="42" data-instance-id="0" data-state="loaded">"#,
      "<p>card</p></div>",
    )
  );
}

#[tokio::test]
async fn failed_component_shows_fallback() {
  let source = MemoryContentSource::new()
    .page(page(1, WELCOME_HTML, "title: 'Welcome';"))
    .fail_component(42, ApiError::network("connection refused"));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  viewer.resolve_components(&source).await;

  assert!(matches!(viewer.component_states()[0].state, RenderState::Error(_)));
  let html = viewer.html();
  assert!(html.contains("<div>Welcome</div>"));
  assert!(html.contains("component-fallback"));
  assert!(html.contains("connection refused"));
}

#[tokio::test]
async fn component_data_overrides_script_defaults() {
  let source = MemoryContentSource::new()
    .page(page(1, WELCOME_HTML, ""))
    .component(component(42, "<h2>{{ heading }}</h2>", "heading = 'default';"))
    .site_data(
      42,
      cms_api::ComponentSiteData {
        id: 1,
        site_id: 1,
        data: Some(json!(r#"{"heading":"From site"}"#)),
        ..Default::default()
      },
    );
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  viewer.resolve_components(&source).await;
  assert!(viewer.html().contains("<h2>From site</h2>"));
}

#[tokio::test]
async fn duplicate_components_fetched_once() {
  let tag = r#"<app-component-viewer componentId="5"></app-component-viewer>"#;
  let source = MemoryContentSource::new()
    .page(page(1, &format!("{tag}{tag}"), ""))
    .component(component(5, "<i>x</i>", ""));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  assert_eq!(viewer.resolve_components(&source).await, 2);
  assert_eq!(source.counts().components(), 1);
  assert_eq!(viewer.document().elements_by_tag(viewer.document().root(), "i").len(), 2);
}

#[tokio::test]
async fn refresh_refetches_component() {
  let source = MemoryContentSource::new()
    .page(page(1, WELCOME_HTML, ""))
    .component(component(42, "<b>c</b>", ""));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  viewer.resolve_components(&source).await;
  viewer.refresh_component(0).unwrap();
  assert_eq!(viewer.component_states()[0].state, RenderState::Loading);
  assert!(!viewer.html().contains("<b>c</b>"));
  viewer.resolve_components(&source).await;
  assert_eq!(source.counts().components(), 2);
  assert!(matches!(viewer.refresh_component(9), Err(EngineError::UnknownInstance(9))));
}

#[tokio::test]
async fn component_styles_are_keyed() {
  let mut def = component(42, "<b>c</b>", "");
  def.style = ".c { color: red; }".into();
  let mut p = page(7, WELCOME_HTML, "");
  p.style = "body { margin: 0; }".into();
  let source = MemoryContentSource::new().page(p).component(def);
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 7).await.unwrap();
  viewer.resolve_components(&source).await;
  assert_eq!(viewer.session().style_keys().collect::<Vec<_>>(), vec!["component:42", "page:7"]);

  let doc = viewer.document_html();
  assert!(doc.starts_with("<!DOCTYPE html>"));
  assert!(doc.contains("<title>Page 7</title>"));
  assert!(doc.contains(r#"<style data-style-key="page:7">body { margin: 0; }</style>"#));
}

#[tokio::test]
async fn teardown_runs_destroy_exactly_once() {
  let (destroyed, record) = counter();
  let mut p = page(7, "<p>seven</p>", "onDestroy() { record(); }");
  p.style = "p { color: green; }".into();
  let source = MemoryContentSource::new().page(p);
  let mut viewer = PageViewer::new();
  viewer.register_native("record", record);

  viewer.load_page(&source, 7).await.unwrap();
  viewer.teardown();
  assert_eq!(destroyed.load(Ordering::SeqCst), 1);
  assert!(viewer.session().style("page:7").is_none());
  assert!(viewer.html().is_empty());

  viewer.teardown();
  viewer.load_page(&source, 7).await.unwrap();
  assert_eq!(destroyed.load(Ordering::SeqCst), 1, "old destroy hook must not rerun");

  drop(viewer);
  assert_eq!(destroyed.load(Ordering::SeqCst), 2, "drop tears down the live context");
}

#[tokio::test]
async fn navigating_destroys_previous_page() {
  let (destroyed, record) = counter();
  let source = MemoryContentSource::new()
    .page(page(1, "<p>one</p>", "onDestroy() { record(); }"))
    .page(page(2, "<p>two</p>", ""));
  let mut viewer = PageViewer::new();
  viewer.register_native("record", record);
  viewer.load_page(&source, 1).await.unwrap();
  viewer.load_page(&source, 2).await.unwrap();
  assert_eq!(destroyed.load(Ordering::SeqCst), 1);
  assert_eq!(viewer.html(), "<p>two</p>");
  assert_eq!(viewer.session().active_pages().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn stale_ticket_is_ignored() {
  let mut viewer = PageViewer::new();
  let first_ticket = viewer.select_page(1);
  let second_ticket = viewer.select_page(2);
  viewer.apply_page(second_ticket, Ok(page(2, "<p>two</p>", ""))).unwrap();
  let stale = viewer.apply_page(first_ticket, Ok(page(1, "<p>one</p>", "")));
  assert!(matches!(stale, Err(EngineError::StaleTicket(1))));
  assert_eq!(viewer.page().map(|p| p.id), Some(2));
  assert_eq!(viewer.html(), "<p>two</p>");
}

#[test]
fn stale_ticket_cannot_complete_components() {
  let mut viewer = PageViewer::new();
  let ticket = viewer.select_page(1);
  viewer.apply_page(ticket, Ok(page(1, WELCOME_HTML, ""))).unwrap();
  let next = viewer.select_page(1);
  viewer.apply_page(next, Ok(page(1, WELCOME_HTML, ""))).unwrap();
  let resolved = ResolvedComponent::fallback(42, &ApiError::not_found("component 42"));
  assert!(viewer.complete_component(ticket, 0, resolved.clone()).is_err());
  assert!(viewer.complete_component(next, 0, resolved).is_ok());
}

#[tokio::test]
async fn fetch_failure_shows_empty_page() {
  let source = MemoryContentSource::new().page(page(1, "<p>one</p>", ""));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  let err = viewer.load_page(&source, 99).await.unwrap_err();
  assert_eq!(err.status(), 404);
  assert!(viewer.page().is_none());
  assert!(viewer.html().is_empty());
}

#[test]
fn repeat_indexes_and_click_by_index() {
  let html = r#"<ul><li *ngFor="let item of items; let i = index" (click)="pick(i)">{{ item }}</li></ul><p>{{ picked }}</p>"#;
  let script = "items = ['a', 'b', 'c']; picked = 'none'; pick(i) { this.picked = this.items[i]; }";
  let mut viewer = PageViewer::new();
  let ticket = viewer.select_page(3);
  viewer.apply_page(ticket, Ok(page(3, html, script))).unwrap();

  let doc = viewer.document();
  let items = doc.elements_by_tag(doc.root(), "li");
  let indexes: Vec<_> = items.iter().map(|&li| doc.attr(li, "data-index")).collect();
  assert_eq!(indexes, vec![Some("0"), Some("1"), Some("2")]);

  let second = items[1];
  assert_eq!(viewer.dispatch(second, "click", &Value::Null), DispatchOutcome::Handled);
  assert!(viewer.html().ends_with("<p>b</p>"));
}

#[test]
fn dispatch_rerenders_bindings() {
  let html = r#"<button (click)="increment()" [disabled]="count >= 2">{{ count }}</button>"#;
  let mut viewer = PageViewer::new();
  let ticket = viewer.select_page(1);
  viewer.apply_page(ticket, Ok(page(1, html, "count = 0; increment() { this.count++; }"))).unwrap();
  assert_eq!(viewer.html(), "<button>0</button>");

  let button = first(&viewer, "button");
  viewer.dispatch(button, "click", &Value::Null);
  assert_eq!(viewer.html(), "<button>1</button>");
  let button = first(&viewer, "button");
  viewer.dispatch(button, "click", &Value::Null);
  assert_eq!(viewer.html(), r#"<button disabled="">2</button>"#);
  assert!(viewer.page_context().unwrap().change_detector().passes() >= 3);
}

#[test]
fn missing_handler_and_no_listener() {
  let mut viewer = PageViewer::new();
  let ticket = viewer.select_page(1);
  viewer.apply_page(ticket, Ok(page(1, r#"<button (click)="nope()">x</button><p>y</p>"#, ""))).unwrap();
  let button = first(&viewer, "button");
  let p = first(&viewer, "p");
  assert_eq!(viewer.dispatch(button, "click", &Value::Null), DispatchOutcome::MissingHandler);
  assert_eq!(viewer.dispatch(p, "click", &Value::Null), DispatchOutcome::NoListener);
  assert_eq!(viewer.dispatch(button, "keyup", &Value::Null), DispatchOutcome::NoListener);
}

#[test]
fn input_event_payload_reaches_handler() {
  let html = r#"<input (input)="setQuery($event.target.value)"><p>{{ query }}</p>"#;
  let mut viewer = PageViewer::new();
  let ticket = viewer.select_page(1);
  viewer.apply_page(ticket, Ok(page(1, html, "query = ''; setQuery(v) { this.query = v; }"))).unwrap();
  let input = first(&viewer, "input");
  viewer.dispatch(input, "input", &json!({"value": "rust"}));
  assert_eq!(viewer.html(), "<input><p>rust</p>");
}

#[tokio::test]
async fn component_events_use_component_context() {
  let page_html = r#"<section (click)="clicks++"><app-component-viewer componentId="8"></app-component-viewer></section><p>{{ clicks }}</p>"#;
  let source = MemoryContentSource::new()
    .page(page(1, page_html, "clicks = 0;"))
    .component(component(8, r#"<button (click)="bump()">{{ n }}</button>"#, "n = 1; bump() { this.n++; }"));
  let mut viewer = PageViewer::new();
  viewer.load_page(&source, 1).await.unwrap();
  viewer.resolve_components(&source).await;

  let button = first(&viewer, "button");
  assert_eq!(viewer.dispatch(button, "click", &Value::Null), DispatchOutcome::Handled);
  let html = viewer.html();
  assert!(html.contains("<button>2</button>"), "component state updated: {html}");
  assert!(html.ends_with("<p>1</p>"), "page listener saw the bubbled click: {html}");
  assert_eq!(viewer.page_context().unwrap().property("clicks"), Some(&json!(1)));
}

#[tokio::test]
async fn site_pages_sorted_without_deleted() {
  let mut a = page(1, "", "");
  a.menu_order = 2;
  let mut b = page(2, "", "");
  b.menu_order = 1;
  let mut gone = page(3, "", "");
  gone.is_deleted = true;
  let source = MemoryContentSource::new().page(a).page(b).page(gone);
  let pages = load_site_pages(&source, 1).await;
  assert_eq!(pages.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1]);
  assert!(load_site_pages(&source, 99).await.is_empty());
}
