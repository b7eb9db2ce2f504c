/* src/cli/core/src/extract.rs */

use anyhow::{Context, Result};
use cms_api::{ContentSource, PageId};
use cms_engine::{ComponentPlaceholder, distinct_component_ids, extract_placeholders};

use crate::ui;

pub async fn page_placeholders(
  source: &dyn ContentSource,
  page_id: PageId,
) -> Result<Vec<ComponentPlaceholder>> {
  let page =
    source.get_page(page_id).await.with_context(|| format!("failed to fetch page {page_id}"))?;
  Ok(extract_placeholders(&page.html))
}

/// `cms extract`: list the component placeholders in a page's stored HTML.
pub async fn run_extract(source: &dyn ContentSource, page_id: PageId, json: bool) -> Result<()> {
  let placeholders = page_placeholders(source, page_id).await?;
  if json {
    ui::raw(&serde_json::to_string_pretty(&placeholders)?);
    return Ok(());
  }
  if placeholders.is_empty() {
    ui::warn(&format!("page {page_id} has no component placeholders"));
    return Ok(());
  }
  for p in &placeholders {
    ui::row(&p.component_id.to_string(), &p.raw_match_text);
  }
  ui::blank();
  let distinct = distinct_component_ids(&placeholders).len();
  ui::ok(&format!("{} placeholders, {distinct} distinct components", placeholders.len()));
  Ok(())
}
