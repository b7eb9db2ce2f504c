/* src/render/engine/rust/src/viewer.rs */

use std::collections::BTreeMap;
use std::fmt;

use cms_api::{ApiResult, ComponentId, ContentSource, PageDefinition, PageId, SiteId};
use cms_script::{Bindings, MethodTable, PageScriptContext, ScriptFn, parse_script};
use futures_util::future::join_all;
use serde_json::Value;

use crate::directive::DirectiveProcessor;
use crate::dom::{Document, NodeId};
use crate::errors::EngineError;
use crate::events::{self, DispatchOutcome, ListenerScope};
use crate::helpers::escape_html;
use crate::mount::{
  ComponentInstance, ComponentRenderState, RenderState, host_elements, mount_placeholders,
};
use crate::resolve::{ComponentResolver, ResolvedComponent};
use crate::session::RenderSession;

/// Proof of a page selection. Only the most recent ticket may apply a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
  generation: u64,
  page_id: PageId,
}

impl PageTicket {
  pub fn page_id(&self) -> PageId {
    self.page_id
  }
}

/// Renders one CMS page at a time: template, page script, mounted
/// components and the live document produced from them.
pub struct PageViewer {
  generation: u64,
  applied: Option<PageTicket>,
  page: Option<PageDefinition>,
  /// Page HTML after placeholders became hosts; never carries bindings.
  template: Document,
  live: Document,
  instances: Vec<ComponentInstance>,
  session: RenderSession,
  natives: MethodTable,
}

impl Default for PageViewer {
  fn default() -> Self {
    Self::new()
  }
}

impl PageViewer {
  pub fn new() -> Self {
    Self {
      generation: 0,
      applied: None,
      page: None,
      template: Document::new(),
      live: Document::new(),
      instances: Vec::new(),
      session: RenderSession::new(),
      natives: MethodTable::new(),
    }
  }

  /// Expose a host function to every page script this viewer activates.
  pub fn register_native(&mut self, name: &str, f: ScriptFn) {
    self.natives.insert(name.to_string(), f.clone());
    if let Some(ctx) = self.page_context_mut() {
      ctx.register_method(name, f);
    }
  }

  pub fn select_page(&mut self, page_id: PageId) -> PageTicket {
    self.generation += 1;
    tracing::debug!(page_id, generation = self.generation, "page selected");
    PageTicket { generation: self.generation, page_id }
  }

  /// Ticket of the page currently shown, for completing components.
  pub fn applied_ticket(&self) -> Option<PageTicket> {
    self.applied
  }

  /// Apply a fetched page. A ticket superseded by a later selection is
  /// rejected without touching the current view. A fetch error clears the
  /// view and is returned for reporting.
  pub fn apply_page(
    &mut self,
    ticket: PageTicket,
    result: ApiResult<PageDefinition>,
  ) -> Result<(), EngineError> {
    if ticket.generation != self.generation {
      tracing::debug!(page_id = ticket.page_id, "ignoring stale page response");
      return Err(EngineError::StaleTicket(ticket.page_id));
    }
    self.unload();
    match result {
      Ok(page) => {
        self.show(ticket, page);
        Ok(())
      }
      Err(e) => {
        tracing::error!(page_id = ticket.page_id, error = %e, "page fetch failed");
        Err(e.into())
      }
    }
  }

  pub async fn load_page(
    &mut self,
    source: &dyn ContentSource,
    page_id: PageId,
  ) -> Result<(), EngineError> {
    let ticket = self.select_page(page_id);
    let result = source.get_page(page_id).await;
    self.apply_page(ticket, result)
  }

  fn show(&mut self, ticket: PageTicket, page: PageDefinition) {
    let mut template = Document::parse(&page.html);
    let root = template.root();
    // DOM-ready: hosts exist before any directive or component work
    self.instances = mount_placeholders(&mut template, root, 0);

    let descriptor = parse_script(&page.javascript);
    if !descriptor.skipped.is_empty() {
      tracing::warn!(
        page_id = page.id,
        skipped = descriptor.skipped.len(),
        "page script partially understood"
      );
    }
    let mut ctx = PageScriptContext::from_descriptor(&descriptor);
    for (name, f) in &self.natives {
      ctx.register_method(name, f.clone());
    }
    self.session.activate_context(page.id, &page.style, ctx);

    tracing::info!(
      page_id = page.id,
      name = %page.name,
      components = self.instances.len(),
      "page applied"
    );
    self.template = template;
    self.page = Some(page);
    self.applied = Some(ticket);
    self.render();
  }

  /// Tear down the current page: its context, its components and their styles.
  fn unload(&mut self) {
    if let Some(page) = self.page.take() {
      self.session.deactivate(page.id);
    }
    for inst in &mut self.instances {
      inst.destroy();
      self.session.remove_style(&inst.style_key());
    }
    self.instances.clear();
    self.template = Document::new();
    self.live = Document::new();
    self.applied = None;
  }

  /// Rebuild the live document from the template and current state.
  pub fn render(&mut self) {
    let Some(page_id) = self.page.as_ref().map(|p| p.id) else {
      self.live = Document::new();
      return;
    };
    let mut live = self.template.clone();
    let root = live.root();
    if let Some(ctx) = self.session.context_mut(page_id) {
      DirectiveProcessor::new(ctx, ListenerScope::Page).process(&mut live, root, &Bindings::new());
      ctx.change_detector().detect_changes();
    }
    for (host, instance_id) in host_elements(&live, root) {
      match self.instances.get_mut(instance_id) {
        Some(inst) => inst.render_into(&mut live, host),
        None => tracing::warn!(instance_id, "host without a mounted instance"),
      }
    }
    self.live = live;
  }

  /// Instances still waiting for content, with the component each shows.
  pub fn pending_components(&self) -> Vec<(usize, ComponentId)> {
    self
      .instances
      .iter()
      .filter(|i| *i.state() == RenderState::Loading)
      .map(|i| (i.instance_id(), i.component_id()))
      .collect()
  }

  /// Resolve every loading instance concurrently, then re-render once.
  /// Each distinct component id is fetched a single time.
  pub async fn resolve_components(&mut self, source: &dyn ContentSource) -> usize {
    let pending = self.pending_components();
    if pending.is_empty() {
      return 0;
    }
    let mut ids: Vec<ComponentId> = Vec::new();
    for (_, id) in &pending {
      if !ids.contains(id) {
        ids.push(*id);
      }
    }

    let resolver = ComponentResolver::new(source);
    let resolved = join_all(ids.iter().map(|&id| resolver.resolve(id))).await;
    let by_id: BTreeMap<ComponentId, ResolvedComponent> = ids.into_iter().zip(resolved).collect();

    let mut completed = 0;
    for (instance_id, component_id) in pending {
      let Some(component) = by_id.get(&component_id) else { continue };
      if self.attach(instance_id, component.clone()).is_ok() {
        completed += 1;
      }
    }
    self.render();
    completed
  }

  /// Complete one instance with content resolved elsewhere.
  pub fn complete_component(
    &mut self,
    ticket: PageTicket,
    instance_id: usize,
    resolved: ResolvedComponent,
  ) -> Result<(), EngineError> {
    if self.applied != Some(ticket) {
      return Err(EngineError::StaleTicket(ticket.page_id));
    }
    self.attach(instance_id, resolved)?;
    self.render();
    Ok(())
  }

  fn attach(&mut self, instance_id: usize, resolved: ResolvedComponent) -> Result<(), EngineError> {
    let inst =
      self.instances.get_mut(instance_id).ok_or(EngineError::UnknownInstance(instance_id))?;
    if !resolved.style.trim().is_empty() {
      self.session.inject_style(&inst.style_key(), &resolved.style);
    }
    inst.complete(resolved);
    Ok(())
  }

  /// Put an instance back into the loading state; the next
  /// [`resolve_components`](Self::resolve_components) fetches it again.
  pub fn refresh_component(&mut self, instance_id: usize) -> Result<(), EngineError> {
    let inst =
      self.instances.get_mut(instance_id).ok_or(EngineError::UnknownInstance(instance_id))?;
    inst.reset();
    self.render();
    Ok(())
  }

  pub fn component_states(&self) -> Vec<ComponentRenderState> {
    self.instances.iter().map(ComponentInstance::render_state).collect()
  }

  /// Dispatch a DOM event at `node` of the live document. Listeners on the
  /// node and its ancestors run innermost first; the page re-renders if any
  /// handler ran.
  pub fn dispatch(&mut self, node: NodeId, event: &str, payload: &Value) -> DispatchOutcome {
    if !self.live.contains(node) {
      return DispatchOutcome::NoListener;
    }
    let listeners = events::listeners_for(&self.live, node, event);
    if listeners.is_empty() {
      return DispatchOutcome::NoListener;
    }
    let event_obj = events::event_object(&self.live, node, event, payload);
    let page_id = self.page.as_ref().map(|p| p.id);

    let mut handled = false;
    for listener in &listeners {
      let ctx = match listener.scope {
        ListenerScope::Page => page_id.and_then(|id| self.session.context_mut(id)),
        ListenerScope::Component(i) => {
          self.instances.get_mut(i).and_then(ComponentInstance::context_mut)
        }
      };
      let Some(ctx) = ctx else { continue };
      if events::invoke(ctx, &self.live, listener, &event_obj) == DispatchOutcome::Handled {
        handled = true;
      }
    }

    if handled {
      self.render();
      DispatchOutcome::Handled
    } else {
      DispatchOutcome::MissingHandler
    }
  }

  pub fn page(&self) -> Option<&PageDefinition> {
    self.page.as_ref()
  }

  pub fn page_context(&self) -> Option<&PageScriptContext> {
    self.session.context(self.page.as_ref()?.id)
  }

  fn page_context_mut(&mut self) -> Option<&mut PageScriptContext> {
    let page_id = self.page.as_ref()?.id;
    self.session.context_mut(page_id)
  }

  pub fn instances(&self) -> &[ComponentInstance] {
    &self.instances
  }

  pub fn session(&self) -> &RenderSession {
    &self.session
  }

  /// The live document as last rendered.
  pub fn document(&self) -> &Document {
    &self.live
  }

  pub fn html(&self) -> String {
    self.live.to_html()
  }

  /// A standalone HTML document: title and meta from the page's SEO fields,
  /// injected styles in the head, the live body.
  pub fn document_html(&self) -> String {
    let mut head = String::from(r#"<meta charset="utf-8">"#);
    if let Some(page) = &self.page {
      let title = page.seo_title.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or(&page.name);
      head.push_str(&format!("<title>{}</title>", escape_html(title)));
      let meta = [("description", &page.seo_description), ("keywords", &page.seo_keywords)];
      for (name, value) in meta {
        if let Some(content) = value.as_deref().filter(|v| !v.trim().is_empty()) {
          head.push_str(&format!(r#"<meta name="{name}" content="{}">"#, escape_html(content)));
        }
      }
    }
    head.push_str(&self.session.render_head());
    format!("<!DOCTYPE html><html><head>{head}</head><body>{}</body></html>", self.html())
  }

  /// Tear down everything this viewer activated. Safe to call repeatedly.
  pub fn teardown(&mut self) {
    self.unload();
    self.session.teardown_all();
  }
}

impl Drop for PageViewer {
  fn drop(&mut self) {
    self.teardown();
  }
}

impl fmt::Debug for PageViewer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PageViewer")
      .field("generation", &self.generation)
      .field("page", &self.page.as_ref().map(|p| p.id))
      .field("instances", &self.instances.len())
      .field("natives", &self.natives.keys().collect::<Vec<_>>())
      .finish_non_exhaustive()
  }
}

/// A site's navigable pages: soft-deleted pages dropped, sorted by menu
/// order. A failed listing is logged and yields no pages.
pub async fn load_site_pages(source: &dyn ContentSource, site_id: SiteId) -> Vec<PageDefinition> {
  match source.list_pages(site_id).await {
    Ok(mut pages) => {
      pages.retain(|p| !p.is_deleted);
      pages.sort_by_key(|p| (p.menu_order, p.id));
      pages
    }
    Err(e) => {
      tracing::error!(site_id, error = %e, "page listing failed");
      Vec::new()
    }
  }
}

#[cfg(test)]
mod tests;
