/* src/client/api/rust/src/memory.rs */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ApiError;
use crate::models::{
  ComponentDefinition, ComponentId, ComponentSiteData, PageDefinition, PageId, SiteId, SiteSummary,
};
use crate::source::{ApiResult, BoxFuture, ContentSource};

#[derive(Debug, Default)]
pub struct FetchCounts {
  pages: AtomicUsize,
  components: AtomicUsize,
  site_data: AtomicUsize,
}

impl FetchCounts {
  pub fn pages(&self) -> usize {
    self.pages.load(Ordering::SeqCst)
  }

  pub fn components(&self) -> usize {
    self.components.load(Ordering::SeqCst)
  }

  pub fn site_data(&self) -> usize {
    self.site_data.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum FailureKey {
  Page(PageId),
  Component(ComponentId),
  SiteData(ComponentId),
}

/// In-memory content source for offline rendering and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentSource {
  sites: Vec<SiteSummary>,
  pages: BTreeMap<PageId, PageDefinition>,
  components: BTreeMap<ComponentId, ComponentDefinition>,
  site_data: BTreeMap<ComponentId, ComponentSiteData>,
  failures: BTreeMap<FailureKey, ApiError>,
  counts: Arc<FetchCounts>,
}

impl MemoryContentSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn site(mut self, site: SiteSummary) -> Self {
    self.sites.push(site);
    self
  }

  pub fn page(mut self, page: PageDefinition) -> Self {
    self.pages.insert(page.id, page);
    self
  }

  pub fn component(mut self, component: ComponentDefinition) -> Self {
    self.components.insert(component.id, component);
    self
  }

  pub fn site_data(mut self, component_id: ComponentId, data: ComponentSiteData) -> Self {
    self.site_data.insert(component_id, data);
    self
  }

  pub fn fail_page(mut self, page_id: PageId, err: ApiError) -> Self {
    self.failures.insert(FailureKey::Page(page_id), err);
    self
  }

  pub fn fail_component(mut self, component_id: ComponentId, err: ApiError) -> Self {
    self.failures.insert(FailureKey::Component(component_id), err);
    self
  }

  pub fn fail_site_data(mut self, component_id: ComponentId, err: ApiError) -> Self {
    self.failures.insert(FailureKey::SiteData(component_id), err);
    self
  }

  pub fn counts(&self) -> &FetchCounts {
    &self.counts
  }

  fn failure(&self, key: &FailureKey) -> Option<ApiError> {
    self.failures.get(key).cloned()
  }
}

fn ready<T: Send + 'static>(value: T) -> BoxFuture<T> {
  Box::pin(std::future::ready(value))
}

impl ContentSource for MemoryContentSource {
  fn list_sites(&self) -> BoxFuture<ApiResult<Vec<SiteSummary>>> {
    ready(Ok(self.sites.clone()))
  }

  fn list_pages(&self, site_id: SiteId) -> BoxFuture<ApiResult<Vec<PageDefinition>>> {
    let pages = self.pages.values().filter(|p| p.site_id == site_id).cloned().collect();
    ready(Ok(pages))
  }

  fn get_page(&self, page_id: PageId) -> BoxFuture<ApiResult<PageDefinition>> {
    self.counts.pages.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.failure(&FailureKey::Page(page_id)) {
      return ready(Err(err));
    }
    let result = self
      .pages
      .get(&page_id)
      .cloned()
      .ok_or_else(|| ApiError::not_found(format!("page {page_id}")));
    ready(result)
  }

  fn get_component(&self, component_id: ComponentId) -> BoxFuture<ApiResult<ComponentDefinition>> {
    self.counts.components.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.failure(&FailureKey::Component(component_id)) {
      return ready(Err(err));
    }
    let result = self
      .components
      .get(&component_id)
      .cloned()
      .ok_or_else(|| ApiError::not_found(format!("component {component_id}")));
    ready(result)
  }

  fn get_site_data(
    &self,
    component_id: ComponentId,
  ) -> BoxFuture<ApiResult<Option<ComponentSiteData>>> {
    self.counts.site_data.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.failure(&FailureKey::SiteData(component_id)) {
      return ready(Err(err));
    }
    ready(Ok(self.site_data.get(&component_id).cloned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(id: PageId, site_id: SiteId) -> PageDefinition {
    PageDefinition { id, site_id, name: format!("page-{id}"), ..Default::default() }
  }

  #[tokio::test]
  async fn list_pages_filters_by_site() {
    let source = MemoryContentSource::new().page(page(1, 1)).page(page(2, 2)).page(page(3, 1));
    let pages = source.list_pages(1).await.unwrap();
    let ids: Vec<_> = pages.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[tokio::test]
  async fn missing_page_is_not_found() {
    let source = MemoryContentSource::new();
    let err = source.get_page(9).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(source.counts().pages(), 1);
  }

  #[tokio::test]
  async fn injected_failure_wins() {
    let source = MemoryContentSource::new()
      .page(page(1, 1))
      .fail_page(1, ApiError::network("connection refused"));
    let err = source.get_page(1).await.unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
  }

  #[tokio::test]
  async fn site_data_absent_is_none() {
    let source = MemoryContentSource::new();
    assert!(source.get_site_data(4).await.unwrap().is_none());
    assert_eq!(source.counts().site_data(), 1);
  }
}
