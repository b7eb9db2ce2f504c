/* src/render/engine/rust/src/resolve.rs */

use cms_api::{ApiError, ComponentDefinition, ComponentId, ComponentSiteData, ContentSource};
use cms_script::helpers::truncate;
use futures_util::future::join;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::helpers::escape_html;

/// Component definition merged with its per-site data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedComponent {
  pub id: ComponentId,
  pub name: String,
  pub template: String,
  pub style: String,
  pub javascript: String,
  /// Per-site data object; empty when absent or unparsable.
  pub data: Map<String, Value>,
  /// Synthetic diagnostic component standing in for a failed template fetch.
  pub fallback: bool,
}

impl ResolvedComponent {
  pub fn from_definition(def: ComponentDefinition, data: Map<String, Value>) -> Self {
    Self {
      id: def.id,
      name: def.name,
      template: def.template,
      style: def.style,
      javascript: def.javascript,
      data,
      fallback: false,
    }
  }

  pub fn fallback(id: ComponentId, err: &ApiError) -> Self {
    let template = format!(
      r#"<div class="component-fallback" data-component-id="{id}"><strong>Component {id}</strong><p>{}</p></div>"#,
      escape_html(&err.to_string())
    );
    Self {
      id,
      name: format!("Component {id}"),
      template,
      style: String::new(),
      javascript: String::new(),
      data: Map::new(),
      fallback: true,
    }
  }
}

/// Decode a site-data payload into an object. JSON text is parsed; an
/// already-decoded object is taken as is. Anything else is empty data.
pub fn decode_site_data(component_id: ComponentId, data: Option<Value>) -> Map<String, Value> {
  match data {
    None | Some(Value::Null) => Map::new(),
    Some(Value::Object(map)) => map,
    Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
    Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
      Ok(Value::Object(map)) => map,
      Ok(other) => {
        tracing::warn!(component_id, kind = %kind(&other), "site data is not an object, ignoring");
        Map::new()
      }
      Err(e) => {
        tracing::warn!(
          component_id,
          error = %e,
          snippet = %truncate(&text, 80),
          "unparsable site data, using empty data"
        );
        Map::new()
      }
    },
    Some(other) => {
      tracing::warn!(component_id, kind = %kind(&other), "unexpected site data payload, ignoring");
      Map::new()
    }
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Fetches and merges component templates with their site data.
pub struct ComponentResolver<'a> {
  source: &'a dyn ContentSource,
}

impl<'a> ComponentResolver<'a> {
  pub fn new(source: &'a dyn ContentSource) -> Self {
    Self { source }
  }

  /// Resolve a component. Never fails: a template fetch error yields the
  /// fallback component, a data fetch error yields empty data.
  pub async fn resolve(&self, component_id: ComponentId) -> ResolvedComponent {
    let (definition, site_data) =
      join(self.source.get_component(component_id), self.source.get_site_data(component_id)).await;

    let data = match site_data {
      Ok(Some(ComponentSiteData { data, .. })) => decode_site_data(component_id, data),
      Ok(None) => Map::new(),
      Err(e) => {
        tracing::warn!(component_id, error = %e, "site data fetch failed, using empty data");
        Map::new()
      }
    };

    match definition {
      Ok(def) => ResolvedComponent::from_definition(def, data),
      Err(e) => {
        tracing::error!(component_id, error = %e, "component fetch failed, rendering fallback");
        ResolvedComponent::fallback(component_id, &e)
      }
    }
  }
}
