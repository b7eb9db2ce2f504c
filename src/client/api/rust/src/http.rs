/* src/client/api/rust/src/http.rs */

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::models::{
  ComponentDefinition, ComponentId, ComponentSiteData, PageDefinition, PageId, SiteId, SiteSummary,
};
use crate::source::{ApiResult, BoxFuture, ContentSource};

/// `ContentSource` backed by the CMS REST API.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
  client: reqwest::Client,
  base_url: String,
}

impl HttpContentSource {
  pub fn new(config: &ApiConfig) -> ApiResult<Self> {
    config.validate()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| ApiError::invalid_config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_url)
  }

  fn get_json<T>(&self, path: String) -> BoxFuture<ApiResult<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    let client = self.client.clone();
    let url = self.url(&path);
    Box::pin(async move {
      tracing::debug!(%url, "GET");
      let resp = client.get(&url).send().await?;
      let status = resp.status();
      if !status.is_success() {
        return Err(ApiError::http(status.as_u16(), format!("GET {url} returned HTTP {status}")));
      }
      resp.json::<T>().await.map_err(|e| ApiError::decode(format!("GET {url}: {e}")))
    })
  }
}

impl ContentSource for HttpContentSource {
  fn list_sites(&self) -> BoxFuture<ApiResult<Vec<SiteSummary>>> {
    self.get_json("/api/Sites".to_string())
  }

  fn list_pages(&self, site_id: SiteId) -> BoxFuture<ApiResult<Vec<PageDefinition>>> {
    self.get_json(format!("/api/Pages?siteId={site_id}"))
  }

  fn get_page(&self, page_id: PageId) -> BoxFuture<ApiResult<PageDefinition>> {
    self.get_json(format!("/api/Pages/{page_id}"))
  }

  fn get_component(&self, component_id: ComponentId) -> BoxFuture<ApiResult<ComponentDefinition>> {
    self.get_json(format!("/api/Components/themecomponent/{component_id}"))
  }

  fn get_site_data(
    &self,
    component_id: ComponentId,
  ) -> BoxFuture<ApiResult<Option<ComponentSiteData>>> {
    let client = self.client.clone();
    let url = self.url(&format!("/api/Components/sitedata/{component_id}"));
    Box::pin(async move {
      tracing::debug!(%url, "GET");
      let resp = client.get(&url).send().await?;
      let status = resp.status();
      // 404 and 204 both mean "no override for this component"
      if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::NO_CONTENT {
        return Ok(None);
      }
      if !status.is_success() {
        return Err(ApiError::http(status.as_u16(), format!("GET {url} returned HTTP {status}")));
      }
      let body = resp.text().await?;
      if body.trim().is_empty() {
        return Ok(None);
      }
      serde_json::from_str::<Option<ComponentSiteData>>(&body)
        .map_err(|e| ApiError::decode(format!("GET {url}: {e}")))
    })
  }
}
