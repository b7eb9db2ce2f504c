/* src/cli/core/src/preview/mod.rs */

// Preview server: renders stored pages through the full pipeline on
// every request. No caching of rendered output; the content source may
// cache fetches.

mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;
use cms_api::{ContentSource, PageId, SiteId};
use cms_engine::{extract_placeholders, load_site_pages};
use serde_json::{Value, json};

use crate::render::{RenderOptions, render_page};
use crate::ui;
use error::PreviewError;

#[derive(Clone)]
pub struct PreviewState {
  source: Arc<dyn ContentSource>,
  options: RenderOptions,
}

impl PreviewState {
  pub fn new(source: Arc<dyn ContentSource>, options: RenderOptions) -> Self {
    Self { source, options }
  }
}

async fn health() -> axum::Json<Value> {
  axum::Json(json!({ "ok": true }))
}

async fn page_handler(
  State(state): State<PreviewState>,
  Path(page_id): Path<PageId>,
) -> Result<Html<String>, PreviewError> {
  let rendered = render_page(state.source.as_ref(), page_id, state.options).await?;
  tracing::info!(
    page_id,
    components = rendered.components.len(),
    failed = rendered.failed_components(),
    "preview rendered"
  );
  Ok(Html(rendered.html))
}

async fn placeholders_handler(
  State(state): State<PreviewState>,
  Path(page_id): Path<PageId>,
) -> Result<axum::Json<Value>, PreviewError> {
  let page = state.source.get_page(page_id).await?;
  let placeholders = extract_placeholders(&page.html);
  Ok(axum::Json(json!({ "ok": true, "data": placeholders })))
}

async fn site_pages_handler(
  State(state): State<PreviewState>,
  Path(site_id): Path<SiteId>,
) -> axum::Json<Value> {
  let pages = load_site_pages(state.source.as_ref(), site_id).await;
  let data: Vec<Value> = pages
    .iter()
    .map(|p| {
      json!({
        "id": p.id,
        "name": p.name,
        "path": p.path,
        "showInMenu": p.show_in_menu,
        "href": format!("/pages/{}", p.id),
      })
    })
    .collect();
  axum::Json(json!({ "ok": true, "data": data }))
}

pub fn router(state: PreviewState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/pages/{id}", get(page_handler))
    .route("/pages/{id}/placeholders", get(placeholders_handler))
    .route("/sites/{id}/pages", get(site_pages_handler))
    .with_state(state)
}

pub async fn serve(state: PreviewState, host: &str, port: u16) -> Result<()> {
  let addr = format!("{host}:{port}");
  let listener =
    tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
  ui::arrow(&format!("preview on http://{addr}/pages/<id>"));
  axum::serve(listener, router(state)).await.context("preview server stopped")?;
  Ok(())
}
