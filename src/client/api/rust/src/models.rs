/* src/client/api/rust/src/models.rs */

use serde::{Deserialize, Serialize};

pub type SiteId = i64;
pub type PageId = i64;
pub type ComponentId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
  pub id: SiteId,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub domain: Option<String>,
  #[serde(default, alias = "isPublish")]
  pub ispublish: bool,
}

/// Stored page. Summaries returned by the site listing omit the three text
/// blobs, so every field other than `id` falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageDefinition {
  pub id: PageId,
  pub name: String,
  #[serde(alias = "url", alias = "slug")]
  pub path: String,
  pub site_id: SiteId,
  pub site_name: Option<String>,
  pub parent_id: Option<PageId>,
  pub child_ids: Vec<PageId>,
  pub html: String,
  #[serde(alias = "css")]
  pub style: String,
  #[serde(alias = "js", alias = "script")]
  pub javascript: String,
  pub seo_title: Option<String>,
  pub seo_description: Option<String>,
  pub seo_keywords: Option<String>,
  pub show_in_menu: bool,
  pub menu_order: i32,
  pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentDefinition {
  pub id: ComponentId,
  pub name: String,
  pub description: String,
  #[serde(alias = "html")]
  pub template: String,
  #[serde(alias = "css")]
  pub style: String,
  #[serde(alias = "js", alias = "script")]
  pub javascript: String,
  pub form_json: Option<String>,
  pub theme_id: Option<i64>,
  pub component_id: Option<i64>,
}

/// Per-site override payload for a component. `data` normally carries JSON
/// text; some deployments return the decoded object directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentSiteData {
  pub id: i64,
  pub site_id: SiteId,
  pub theme_component_id: Option<i64>,
  pub component_id: Option<i64>,
  pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn page_summary_without_blobs() {
    let page: PageDefinition =
      serde_json::from_value(json!({"id": 3, "name": "Home", "siteId": 1, "menuOrder": 2}))
        .unwrap();
    assert_eq!(page.id, 3);
    assert_eq!(page.site_id, 1);
    assert_eq!(page.menu_order, 2);
    assert!(page.html.is_empty());
    assert!(!page.is_deleted);
  }

  #[test]
  fn full_page_camel_case() {
    let page: PageDefinition = serde_json::from_value(json!({
      "id": 7,
      "name": "About",
      "path": "/about",
      "siteId": 2,
      "siteName": "Main",
      "parentId": 1,
      "html": "<div>{{title}}</div>",
      "style": "div { color: red; }",
      "javascript": "title: 'About';",
      "seoTitle": "About us",
      "showInMenu": true,
      "isDeleted": false
    }))
    .unwrap();
    assert_eq!(page.path, "/about");
    assert_eq!(page.site_name.as_deref(), Some("Main"));
    assert_eq!(page.parent_id, Some(1));
    assert_eq!(page.javascript, "title: 'About';");
    assert_eq!(page.seo_title.as_deref(), Some("About us"));
    assert!(page.show_in_menu);
  }

  #[test]
  fn component_aliases() {
    let comp: ComponentDefinition = serde_json::from_value(json!({
      "id": 42,
      "name": "Hero",
      "html": "<h1>{{ heading }}</h1>",
      "css": "h1 { margin: 0; }",
      "js": "heading: 'Hi';",
      "themeId": 5
    }))
    .unwrap();
    assert_eq!(comp.template, "<h1>{{ heading }}</h1>");
    assert_eq!(comp.style, "h1 { margin: 0; }");
    assert_eq!(comp.javascript, "heading: 'Hi';");
    assert_eq!(comp.theme_id, Some(5));
    assert!(comp.form_json.is_none());
  }

  #[test]
  fn site_data_string_payload() {
    let data: ComponentSiteData = serde_json::from_value(json!({
      "id": 1,
      "siteId": 2,
      "themeComponentId": 42,
      "data": "{\"heading\":\"Welcome\"}"
    }))
    .unwrap();
    assert_eq!(data.theme_component_id, Some(42));
    assert_eq!(data.data, Some(json!("{\"heading\":\"Welcome\"}")));
  }

  #[test]
  fn site_summary_publish_flag() {
    let site: SiteSummary =
      serde_json::from_value(json!({"id": 1, "name": "Main", "ispublish": true})).unwrap();
    assert!(site.ispublish);
    assert!(site.domain.is_none());
  }
}
