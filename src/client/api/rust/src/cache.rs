/* src/client/api/rust/src/cache.rs */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{
  ComponentDefinition, ComponentId, ComponentSiteData, PageDefinition, PageId, SiteId, SiteSummary,
};
use crate::source::{ApiResult, BoxFuture, ContentSource};

#[derive(Default)]
struct CacheState {
  pages: HashMap<PageId, PageDefinition>,
  components: HashMap<ComponentId, ComponentDefinition>,
}

/// Memoizes page and component fetches by id. Failed fetches are not cached,
/// so the next request retries.
pub struct CachedSource<S> {
  inner: S,
  state: Arc<Mutex<CacheState>>,
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
  state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<S: ContentSource> CachedSource<S> {
  pub fn new(inner: S) -> Self {
    Self { inner, state: Arc::new(Mutex::new(CacheState::default())) }
  }

  pub fn inner(&self) -> &S {
    &self.inner
  }

  pub fn invalidate_page(&self, page_id: PageId) {
    lock(&self.state).pages.remove(&page_id);
  }

  pub fn invalidate_component(&self, component_id: ComponentId) {
    lock(&self.state).components.remove(&component_id);
  }

  pub fn invalidate_all(&self) {
    let mut state = lock(&self.state);
    state.pages.clear();
    state.components.clear();
  }
}

impl<S: ContentSource> ContentSource for CachedSource<S> {
  fn list_sites(&self) -> BoxFuture<ApiResult<Vec<SiteSummary>>> {
    self.inner.list_sites()
  }

  fn list_pages(&self, site_id: SiteId) -> BoxFuture<ApiResult<Vec<PageDefinition>>> {
    self.inner.list_pages(site_id)
  }

  fn get_page(&self, page_id: PageId) -> BoxFuture<ApiResult<PageDefinition>> {
    if let Some(page) = lock(&self.state).pages.get(&page_id).cloned() {
      return Box::pin(std::future::ready(Ok(page)));
    }
    let fetch = self.inner.get_page(page_id);
    let state = Arc::clone(&self.state);
    Box::pin(async move {
      let page = fetch.await?;
      lock(&state).pages.insert(page_id, page.clone());
      Ok(page)
    })
  }

  fn get_component(&self, component_id: ComponentId) -> BoxFuture<ApiResult<ComponentDefinition>> {
    if let Some(component) = lock(&self.state).components.get(&component_id).cloned() {
      return Box::pin(std::future::ready(Ok(component)));
    }
    let fetch = self.inner.get_component(component_id);
    let state = Arc::clone(&self.state);
    Box::pin(async move {
      let component = fetch.await?;
      lock(&state).components.insert(component_id, component.clone());
      Ok(component)
    })
  }

  fn get_site_data(
    &self,
    component_id: ComponentId,
  ) -> BoxFuture<ApiResult<Option<ComponentSiteData>>> {
    // site data is edited independently of the component and stays uncached
    self.inner.get_site_data(component_id)
  }
}
