/* src/cli/core/src/render.rs */

use std::path::Path;

use anyhow::{Context, Result};
use cms_api::{ContentSource, PageId};
use cms_engine::{ComponentRenderState, EngineError, PageViewer, RenderState};

use crate::config::RenderSection;
use crate::ui;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
  pub document: bool,
  pub resolve_components: bool,
}

impl From<&RenderSection> for RenderOptions {
  fn from(section: &RenderSection) -> Self {
    Self { document: section.document, resolve_components: section.resolve_components }
  }
}

#[derive(Debug)]
pub struct RenderedPage {
  pub page_id: PageId,
  pub name: String,
  pub html: String,
  pub components: Vec<ComponentRenderState>,
}

impl RenderedPage {
  pub fn failed_components(&self) -> usize {
    self.components.iter().filter(|c| matches!(c.state, RenderState::Error(_))).count()
  }
}

/// Run the whole pipeline for one page: fetch, mount, script, directives,
/// then (optionally) resolve every mounted component and render again.
pub async fn render_page(
  source: &dyn ContentSource,
  page_id: PageId,
  options: RenderOptions,
) -> Result<RenderedPage, EngineError> {
  let mut viewer = PageViewer::new();
  viewer.load_page(source, page_id).await?;
  if options.resolve_components {
    let resolved = viewer.resolve_components(source).await;
    tracing::debug!(page_id, resolved, "components resolved");
  }
  let html = if options.document { viewer.document_html() } else { viewer.html() };
  let name = viewer.page().map(|p| p.name.clone()).unwrap_or_default();
  Ok(RenderedPage { page_id, name, html, components: viewer.component_states() })
}

/// `cms render`: write the page to `out`, or stdout when no path is given.
pub async fn run_render(
  source: &dyn ContentSource,
  page_id: PageId,
  out: Option<&Path>,
  options: RenderOptions,
) -> Result<()> {
  let rendered = render_page(source, page_id, options)
    .await
    .with_context(|| format!("failed to render page {page_id}"))?;

  let Some(out) = out else {
    ui::raw(&rendered.html);
    return Ok(());
  };

  std::fs::write(out, &rendered.html)
    .with_context(|| format!("failed to write {}", out.display()))?;
  ui::ok(&format!("{} (page {})", rendered.name, rendered.page_id));
  ui::detail(&format!("{} components", rendered.components.len()));
  for c in &rendered.components {
    if let RenderState::Error(msg) = &c.state {
      ui::fail(&format!("instance {}: {msg}", c.instance_id));
    }
  }
  ui::ok(&format!("{}  {}", out.display(), ui::format_size(rendered.html.len())));
  Ok(())
}
