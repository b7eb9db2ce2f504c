/* src/client/api/rust/src/source.rs */

use std::future::Future;
use std::pin::Pin;

use crate::errors::ApiError;
use crate::models::{
  ComponentDefinition, ComponentId, ComponentSiteData, PageDefinition, PageId, SiteId, SiteSummary,
};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type ApiResult<T> = Result<T, ApiError>;

/// Read-only view of the CMS REST surface consumed by the renderer.
///
/// Methods return owned futures so implementations can be shared behind
/// `Arc<dyn ContentSource>` and polled after the borrow ends.
pub trait ContentSource: Send + Sync {
  fn list_sites(&self) -> BoxFuture<ApiResult<Vec<SiteSummary>>>;

  fn list_pages(&self, site_id: SiteId) -> BoxFuture<ApiResult<Vec<PageDefinition>>>;

  fn get_page(&self, page_id: PageId) -> BoxFuture<ApiResult<PageDefinition>>;

  fn get_component(&self, component_id: ComponentId) -> BoxFuture<ApiResult<ComponentDefinition>>;

  /// `Ok(None)` when the component has no per-site data. Absence is not an error.
  fn get_site_data(
    &self,
    component_id: ComponentId,
  ) -> BoxFuture<ApiResult<Option<ComponentSiteData>>>;
}

impl<S: ContentSource + ?Sized> ContentSource for std::sync::Arc<S> {
  fn list_sites(&self) -> BoxFuture<ApiResult<Vec<SiteSummary>>> {
    (**self).list_sites()
  }

  fn list_pages(&self, site_id: SiteId) -> BoxFuture<ApiResult<Vec<PageDefinition>>> {
    (**self).list_pages(site_id)
  }

  fn get_page(&self, page_id: PageId) -> BoxFuture<ApiResult<PageDefinition>> {
    (**self).get_page(page_id)
  }

  fn get_component(&self, component_id: ComponentId) -> BoxFuture<ApiResult<ComponentDefinition>> {
    (**self).get_component(component_id)
  }

  fn get_site_data(
    &self,
    component_id: ComponentId,
  ) -> BoxFuture<ApiResult<Option<ComponentSiteData>>> {
    (**self).get_site_data(component_id)
  }
}
