/* src/render/engine/rust/src/mount.rs */

use cms_api::{ComponentId, PageId};
use cms_script::{Bindings, PageScriptContext, parse_script};
use serde::Serialize;

use crate::directive::DirectiveProcessor;
use crate::dom::{Attr, Document, NodeId};
use crate::events::ListenerScope;
use crate::placeholder::{PLACEHOLDER_TAG, parse_component_id};
use crate::resolve::ResolvedComponent;

pub const HOST_CLASS: &str = "component-host";
pub const HOST_COMPONENT_ATTR: &str = "data-component-id";
pub const HOST_INSTANCE_ATTR: &str = "data-instance-id";
pub const HOST_STATE_ATTR: &str = "data-state";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
  Loading,
  Loaded,
  Error(String),
}

impl RenderState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Loading => "loading",
      Self::Loaded => "loaded",
      Self::Error(_) => "error",
    }
  }
}

/// Snapshot of one mounted instance, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRenderState {
  pub instance_id: usize,
  pub component_id: ComponentId,
  pub state: RenderState,
}

/// A component mounted in place of a placeholder.
#[derive(Debug)]
pub struct ComponentInstance {
  instance_id: usize,
  component_id: ComponentId,
  state: RenderState,
  resolved: Option<ResolvedComponent>,
  context: Option<PageScriptContext>,
}

impl ComponentInstance {
  pub fn new(instance_id: usize, component_id: ComponentId) -> Self {
    Self { instance_id, component_id, state: RenderState::Loading, resolved: None, context: None }
  }

  pub fn instance_id(&self) -> usize {
    self.instance_id
  }

  pub fn component_id(&self) -> ComponentId {
    self.component_id
  }

  pub fn state(&self) -> &RenderState {
    &self.state
  }

  pub fn resolved(&self) -> Option<&ResolvedComponent> {
    self.resolved.as_ref()
  }

  pub fn context(&self) -> Option<&PageScriptContext> {
    self.context.as_ref()
  }

  pub fn context_mut(&mut self) -> Option<&mut PageScriptContext> {
    self.context.as_mut()
  }

  pub fn style_key(&self) -> String {
    component_style_key(self.component_id)
  }

  pub fn render_state(&self) -> ComponentRenderState {
    ComponentRenderState {
      instance_id: self.instance_id,
      component_id: self.component_id,
      state: self.state.clone(),
    }
  }

  /// Attach resolved content: build the component's script context from
  /// its JavaScript, overlay the site data, run its init hook.
  pub fn complete(&mut self, resolved: ResolvedComponent) {
    self.destroy();
    let descriptor = parse_script(&resolved.javascript);
    let mut ctx = PageScriptContext::from_descriptor(&descriptor);
    ctx.merge_properties(&resolved.data);
    if let Err(e) = ctx.run_on_init() {
      tracing::warn!(component_id = self.component_id, error = %e, "component init hook failed");
    }
    self.state = if resolved.fallback {
      RenderState::Error(format!("component {} failed to load", self.component_id))
    } else {
      RenderState::Loaded
    };
    tracing::debug!(
      instance_id = self.instance_id,
      component_id = self.component_id,
      state = self.state.as_str(),
      "component resolved"
    );
    self.context = Some(ctx);
    self.resolved = Some(resolved);
  }

  /// Drop resolved content and go back to loading.
  pub fn reset(&mut self) {
    self.destroy();
    self.resolved = None;
    self.state = RenderState::Loading;
  }

  /// Run the component's destroy hook, if it still has a context.
  pub fn destroy(&mut self) {
    let Some(mut ctx) = self.context.take() else { return };
    if let Err(e) = ctx.run_on_destroy() {
      tracing::warn!(component_id = self.component_id, error = %e, "component destroy hook failed");
    }
  }

  /// Render into a host element of a live document. Listeners registered
  /// here dispatch into this instance's context.
  pub fn render_into(&mut self, doc: &mut Document, host: NodeId) {
    doc.set_attr(host, HOST_STATE_ATTR, Some(self.state.as_str().to_string()));
    doc.clear_children(host);
    let Some(resolved) = &self.resolved else { return };
    doc.append_html(host, &resolved.template);
    if let Some(ctx) = self.context.as_mut() {
      DirectiveProcessor::new(ctx, ListenerScope::Component(self.instance_id)).process(
        doc,
        host,
        &Bindings::new(),
      );
    }
  }
}

pub fn page_style_key(page_id: PageId) -> String {
  format!("page:{page_id}")
}

pub fn component_style_key(component_id: ComponentId) -> String {
  format!("component:{component_id}")
}

/// The component id a placeholder element names, bound syntax first.
fn placeholder_id(doc: &Document, node: NodeId) -> Option<ComponentId> {
  let raw = doc.attr(node, "[componentId]").or_else(|| doc.attr(node, "componentId"))?;
  parse_component_id(raw)
}

/// Replace every placeholder element under `root` with a component host and
/// return one loading instance per host, numbered from `first_instance`.
///
/// Placeholders with a malformed id are left in place.
pub fn mount_placeholders(
  doc: &mut Document,
  root: NodeId,
  first_instance: usize,
) -> Vec<ComponentInstance> {
  let mut instances = Vec::new();
  for node in doc.elements_by_tag(root, PLACEHOLDER_TAG) {
    let Some(component_id) = placeholder_id(doc, node) else {
      tracing::debug!(node = %node, "placeholder without a usable component id");
      continue;
    };
    let instance_id = first_instance + instances.len();
    let host = doc.create_element(
      "div",
      vec![
        Attr::new("class", HOST_CLASS),
        Attr::new(HOST_COMPONENT_ATTR, component_id.to_string()),
        Attr::new(HOST_INSTANCE_ATTR, instance_id.to_string()),
        Attr::new(HOST_STATE_ATTR, RenderState::Loading.as_str()),
      ],
    );
    doc.replace_with(node, &[host]);
    instances.push(ComponentInstance::new(instance_id, component_id));
  }
  tracing::debug!(count = instances.len(), "mounted component placeholders");
  instances
}

/// Host elements under `root`, with the instance id each one carries.
pub fn host_elements(doc: &Document, root: NodeId) -> Vec<(NodeId, usize)> {
  doc
    .descendants(root)
    .into_iter()
    .filter_map(|n| {
      let instance_id = doc.attr(n, HOST_INSTANCE_ATTR)?.parse().ok()?;
      Some((n, instance_id))
    })
    .collect()
}
