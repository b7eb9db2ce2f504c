/* src/client/api/rust/src/lib.rs */

pub mod cache;
pub mod config;
pub mod errors;
pub mod http;
pub mod memory;
pub mod models;
pub mod source;

// Re-exports for ergonomic use
pub use cache::CachedSource;
pub use config::ApiConfig;
pub use errors::ApiError;
pub use http::HttpContentSource;
pub use memory::{FetchCounts, MemoryContentSource};
pub use models::{
  ComponentDefinition, ComponentId, ComponentSiteData, PageDefinition, PageId, SiteId, SiteSummary,
};
pub use source::{ApiResult, BoxFuture, ContentSource};
