/* src/render/engine/rust/src/dom.rs */

use std::fmt;

use crate::events::Listener;
use crate::helpers::{decode_entities, escape_attr, is_raw_text_element, is_void_element};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Attribute with a decoded value; `None` is a bare attribute (`<input disabled>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
  pub name: String,
  pub value: Option<String>,
}

impl Attr {
  pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self { name: name.into(), value: Some(value.into()) }
  }

  pub fn value(&self) -> &str {
    self.value.as_deref().unwrap_or("")
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  Root,
  Element { tag: String, attrs: Vec<Attr>, self_closing: bool },
  /// Raw HTML text, entities left encoded.
  Text(String),
  Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
  kind: NodeKind,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
  /// Subtree came from evaluated data rather than the template.
  inert: bool,
  /// Attributes whose values came from evaluated data.
  inert_attrs: Vec<String>,
}

impl Node {
  fn new(kind: NodeKind) -> Self {
    Self { kind, parent: None, children: Vec::new(), inert: false, inert_attrs: Vec::new() }
  }
}

/// Arena-backed HTML document. Removing a node detaches it; the slot stays
/// in the arena until the document is dropped.
#[derive(Debug, Clone)]
pub struct Document {
  nodes: Vec<Node>,
  pub(crate) listeners: Vec<Listener>,
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

impl Document {
  pub fn new() -> Self {
    Self {
      nodes: vec![Node::new(NodeKind::Root)],
      listeners: Vec::new(),
    }
  }

  /// Parse semi-trusted HTML. Unbalanced markup is tolerated: stray closing
  /// tags are dropped and unclosed elements end at their parent's close.
  pub fn parse(html: &str) -> Self {
    let mut doc = Self::new();
    let root = doc.root();
    let mut parser = HtmlParser { bytes: html.as_bytes(), src: html, pos: 0 };
    parser.parse_nodes(&mut doc, root, &mut Vec::new());
    doc
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn contains(&self, id: NodeId) -> bool {
    id.0 < self.nodes.len()
  }

  fn push(&mut self, kind: NodeKind) -> NodeId {
    self.nodes.push(Node::new(kind));
    NodeId(self.nodes.len() - 1)
  }

  pub fn create_element(&mut self, tag: &str, attrs: Vec<Attr>) -> NodeId {
    self.push(NodeKind::Element { tag: tag.to_string(), attrs, self_closing: false })
  }

  pub fn create_text(&mut self, text: &str) -> NodeId {
    self.push(NodeKind::Text(text.to_string()))
  }

  pub fn kind(&self, id: NodeId) -> &NodeKind {
    &self.nodes[id.0].kind
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes[id.0].parent
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    &self.nodes[id.0].children
  }

  pub fn is_element(&self, id: NodeId) -> bool {
    matches!(self.kind(id), NodeKind::Element { .. })
  }

  pub fn tag(&self, id: NodeId) -> Option<&str> {
    match self.kind(id) {
      NodeKind::Element { tag, .. } => Some(tag),
      _ => None,
    }
  }

  pub fn text(&self, id: NodeId) -> Option<&str> {
    match self.kind(id) {
      NodeKind::Text(t) => Some(t),
      _ => None,
    }
  }

  pub fn set_text(&mut self, id: NodeId, text: String) {
    if let NodeKind::Text(t) = &mut self.nodes[id.0].kind {
      *t = text;
    }
  }

  pub fn attrs(&self, id: NodeId) -> &[Attr] {
    match self.kind(id) {
      NodeKind::Element { attrs, .. } => attrs,
      _ => &[],
    }
  }

  fn attrs_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attr>> {
    match &mut self.nodes[id.0].kind {
      NodeKind::Element { attrs, .. } => Some(attrs),
      _ => None,
    }
  }

  /// Attribute value by name, ASCII case-insensitive. Bare attributes read as "".
  pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
    self.attrs(id).iter().find(|a| a.name.eq_ignore_ascii_case(name)).map(Attr::value)
  }

  pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
    self.attrs(id).iter().any(|a| a.name.eq_ignore_ascii_case(name))
  }

  /// Set or replace an attribute, keeping its position when it already exists.
  pub fn set_attr(&mut self, id: NodeId, name: &str, value: Option<String>) {
    let Some(attrs) = self.attrs_mut(id) else { return };
    match attrs.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
      Some(existing) => existing.value = value,
      None => attrs.push(Attr { name: name.to_string(), value }),
    }
  }

  pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<Attr> {
    self.nodes[id.0].inert_attrs.retain(|a| !a.eq_ignore_ascii_case(name));
    let attrs = self.attrs_mut(id)?;
    let pos = attrs.iter().position(|a| a.name.eq_ignore_ascii_case(name))?;
    Some(attrs.remove(pos))
  }

  /// Flag a subtree as data: directive passes neither evaluate nor enter it.
  pub fn mark_inert(&mut self, id: NodeId) {
    self.nodes[id.0].inert = true;
  }

  pub fn is_inert(&self, id: NodeId) -> bool {
    self.nodes[id.0].inert
  }

  /// Flag one attribute value as data so it is never interpolated again.
  pub fn mark_attr_inert(&mut self, id: NodeId, name: &str) {
    if !self.is_attr_inert(id, name) {
      self.nodes[id.0].inert_attrs.push(name.to_string());
    }
  }

  pub fn is_attr_inert(&self, id: NodeId, name: &str) -> bool {
    self.nodes[id.0].inert_attrs.iter().any(|a| a.eq_ignore_ascii_case(name))
  }

  pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
    self.detach(child);
    self.nodes[child.0].parent = Some(parent);
    self.nodes[parent.0].children.push(child);
  }

  /// Splice `replacements` into the parent of `old`, in order, at `old`'s
  /// position. `old` ends detached.
  pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) {
    let Some(parent) = self.parent(old) else { return };
    for &r in replacements {
      self.detach(r);
    }
    let Some(pos) = self.nodes[parent.0].children.iter().position(|&c| c == old) else { return };
    self.nodes[parent.0].children.splice(pos..=pos, replacements.iter().copied());
    for &r in replacements {
      self.nodes[r.0].parent = Some(parent);
    }
    self.nodes[old.0].parent = None;
  }

  pub fn detach(&mut self, id: NodeId) {
    if let Some(parent) = self.nodes[id.0].parent.take() {
      self.nodes[parent.0].children.retain(|&c| c != id);
    }
  }

  pub fn clear_children(&mut self, id: NodeId) {
    let children = std::mem::take(&mut self.nodes[id.0].children);
    for child in children {
      self.nodes[child.0].parent = None;
    }
  }

  /// Deep copy of a subtree within this document. The copy is detached.
  pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
    let kind = self.nodes[id.0].kind.clone();
    let copy = self.push(kind);
    self.nodes[copy.0].inert = self.nodes[id.0].inert;
    self.nodes[copy.0].inert_attrs = self.nodes[id.0].inert_attrs.clone();
    let children = self.nodes[id.0].children.clone();
    for child in children {
      let child_copy = self.clone_subtree(child);
      self.nodes[child_copy.0].parent = Some(copy);
      self.nodes[copy.0].children.push(child_copy);
    }
    copy
  }

  /// Deep copy of a subtree from another document. The copy is detached.
  pub fn import_subtree(&mut self, other: &Document, id: NodeId) -> NodeId {
    let copy = self.push(other.nodes[id.0].kind.clone());
    for &child in &other.nodes[id.0].children {
      let child_copy = self.import_subtree(other, child);
      self.nodes[child_copy.0].parent = Some(copy);
      self.nodes[copy.0].children.push(child_copy);
    }
    copy
  }

  /// Parse `html` and append the resulting nodes to `parent`.
  pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
    let fragment = Document::parse(html);
    let mut added = Vec::new();
    for &child in fragment.children(fragment.root()) {
      let copy = self.import_subtree(&fragment, child);
      self.append_child(parent, copy);
      added.push(copy);
    }
    added
  }

  pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(self.parent(id), |&p| self.parent(p))
  }

  pub fn is_attached(&self, id: NodeId) -> bool {
    id == self.root() || self.ancestors(id).any(|a| a == self.root())
  }

  /// Descendants of `id` in document order, excluding `id` itself.
  pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
    while let Some(next) = stack.pop() {
      out.push(next);
      stack.extend(self.children(next).iter().rev().copied());
    }
    out
  }

  pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
    self
      .descendants(id)
      .into_iter()
      .filter(|&n| self.tag(n).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
      .collect()
  }

  /// Concatenated text of the subtree, entities decoded.
  pub fn text_content(&self, id: NodeId) -> String {
    let mut out = String::new();
    if let Some(t) = self.text(id) {
      out.push_str(&decode_entities(t));
    }
    for n in self.descendants(id) {
      if let Some(t) = self.text(n) {
        out.push_str(&decode_entities(t));
      }
    }
    out
  }

  pub fn outer_html(&self, id: NodeId) -> String {
    let mut out = String::new();
    self.serialize_node(id, &mut out);
    out
  }

  pub fn inner_html(&self, id: NodeId) -> String {
    let mut out = String::new();
    for &child in self.children(id) {
      self.serialize_node(child, &mut out);
    }
    out
  }

  pub fn to_html(&self) -> String {
    self.inner_html(self.root())
  }

  fn serialize_node(&self, id: NodeId, out: &mut String) {
    match self.kind(id) {
      NodeKind::Root => {
        for &child in self.children(id) {
          self.serialize_node(child, out);
        }
      }
      NodeKind::Element { tag, attrs, self_closing } => {
        out.push('<');
        out.push_str(tag);
        for attr in attrs {
          out.push(' ');
          out.push_str(&attr.name);
          if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
          }
        }
        if *self_closing && self.children(id).is_empty() {
          out.push_str("/>");
          return;
        }
        out.push('>');
        if is_void_element(tag) && self.children(id).is_empty() {
          return;
        }
        for &child in self.children(id) {
          self.serialize_node(child, out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
      }
      NodeKind::Text(text) => out.push_str(text),
      NodeKind::Comment(content) => {
        out.push_str("<!--");
        out.push_str(content);
        out.push_str("-->");
      }
    }
  }

  pub fn listeners(&self) -> &[Listener] {
    &self.listeners
  }

  pub(crate) fn add_listener(&mut self, listener: Listener) {
    self.listeners.push(listener);
  }
}

struct HtmlParser<'a> {
  bytes: &'a [u8],
  src: &'a str,
  pos: usize,
}

impl HtmlParser<'_> {
  fn starts_with(&self, s: &str) -> bool {
    self.bytes[self.pos..].starts_with(s.as_bytes())
  }

  fn parse_nodes(&mut self, doc: &mut Document, parent: NodeId, open: &mut Vec<String>) {
    while self.pos < self.bytes.len() {
      if self.bytes[self.pos] == b'<' {
        // Closing tag
        if self.bytes.get(self.pos + 1) == Some(&b'/') {
          let name = self.closing_tag_name();
          match open.iter().rposition(|t| t.eq_ignore_ascii_case(&name)) {
            // Our own close: consume and return
            Some(i) if i + 1 == open.len() => {
              self.skip_past(b'>');
              return;
            }
            // Closes an ancestor: leave it for them
            Some(_) => return,
            // Stray: drop it
            None => {
              self.skip_past(b'>');
              continue;
            }
          }
        }

        if self.starts_with("<!--") {
          let node = self.parse_comment(doc);
          doc.append_child(parent, node);
          continue;
        }

        if self.bytes.get(self.pos + 1).is_some_and(|c| c.is_ascii_alphabetic()) {
          self.parse_element(doc, parent, open);
          continue;
        }

        // Doctype, processing instruction or a lone '<': keep as text
        if self.bytes.get(self.pos + 1) == Some(&b'!') {
          let start = self.pos;
          self.skip_past(b'>');
          let node = doc.create_text(&self.src[start..self.pos]);
          doc.append_child(parent, node);
          continue;
        }
      }

      let start = self.pos;
      self.pos += 1;
      while self.pos < self.bytes.len() && self.bytes[self.pos] != b'<' {
        self.pos += 1;
      }
      let node = doc.create_text(&self.src[start..self.pos]);
      doc.append_child(parent, node);
    }
  }

  fn closing_tag_name(&self) -> String {
    let start = self.pos + 2;
    let mut end = start;
    while end < self.bytes.len() {
      let b = self.bytes[end];
      if b.is_ascii_whitespace() || b == b'>' {
        break;
      }
      end += 1;
    }
    self.src[start..end].to_string()
  }

  fn skip_past(&mut self, byte: u8) {
    while self.pos < self.bytes.len() && self.bytes[self.pos] != byte {
      self.pos += 1;
    }
    self.pos = (self.pos + 1).min(self.bytes.len());
  }

  fn parse_comment(&mut self, doc: &mut Document) -> NodeId {
    // Skip "<!--"
    self.pos += 4;
    let start = self.pos;
    let (content, next) = match self.src[start..].find("-->") {
      Some(end) => (&self.src[start..start + end], start + end + 3),
      None => (&self.src[start..], self.bytes.len()),
    };
    self.pos = next;
    doc.push(NodeKind::Comment(content.to_string()))
  }

  fn parse_element(&mut self, doc: &mut Document, parent: NodeId, open: &mut Vec<String>) {
    // Skip '<'
    self.pos += 1;
    let tag_start = self.pos;
    while self.pos < self.bytes.len()
      && !self.bytes[self.pos].is_ascii_whitespace()
      && self.bytes[self.pos] != b'>'
      && self.bytes[self.pos] != b'/'
    {
      self.pos += 1;
    }
    let tag = self.src[tag_start..self.pos].to_string();

    // Attributes run to the first unquoted '>' or '/>'
    let attrs_start = self.pos;
    let mut in_quote: Option<u8> = None;
    let mut self_closing = false;
    let attrs_end = loop {
      if self.pos >= self.bytes.len() {
        break self.pos;
      }
      let b = self.bytes[self.pos];
      match in_quote {
        Some(q) => {
          if b == q {
            in_quote = None;
          }
          self.pos += 1;
        }
        None if b == b'"' || b == b'\'' => {
          in_quote = Some(b);
          self.pos += 1;
        }
        None if b == b'/' && self.bytes.get(self.pos + 1) == Some(&b'>') => {
          self_closing = true;
          let end = self.pos;
          self.pos += 2;
          break end;
        }
        None if b == b'>' => {
          let end = self.pos;
          self.pos += 1;
          break end;
        }
        None => self.pos += 1,
      }
    };
    let attrs = parse_attrs(&self.src[attrs_start..attrs_end]);
    let node = doc.push(NodeKind::Element { tag: tag.clone(), attrs, self_closing });
    doc.append_child(parent, node);

    if self_closing || is_void_element(&tag) {
      return;
    }

    if is_raw_text_element(&tag) {
      let close = format!("</{tag}");
      let lower = self.src[self.pos..].to_ascii_lowercase();
      let end = lower.find(&close.to_ascii_lowercase()).map_or(self.bytes.len(), |i| self.pos + i);
      if end > self.pos {
        let text = doc.create_text(&self.src[self.pos..end]);
        doc.append_child(node, text);
      }
      self.pos = end;
      if self.pos < self.bytes.len() {
        self.skip_past(b'>');
      }
      return;
    }

    open.push(tag);
    self.parse_nodes(doc, node, open);
    open.pop();
  }
}

/// Split a raw attribute string into name/value pairs. Names may carry
/// binding punctuation (`[prop]`, `(event)`, `*ngFor`).
pub(crate) fn parse_attrs(raw: &str) -> Vec<Attr> {
  let bytes = raw.as_bytes();
  let mut attrs = Vec::new();
  let mut i = 0;
  while i < bytes.len() {
    while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
      i += 1;
    }
    if i >= bytes.len() {
      break;
    }
    let name_start = i;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
      i += 1;
    }
    if i == name_start {
      i += 1;
      continue;
    }
    let name = &raw[name_start..i];
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
      i += 1;
    }
    if bytes.get(i) != Some(&b'=') {
      attrs.push(Attr { name: name.to_string(), value: None });
      continue;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
      i += 1;
    }
    let value = match bytes.get(i) {
      Some(&q) if q == b'"' || q == b'\'' => {
        let start = i + 1;
        let end = raw[start..].find(q as char).map_or(raw.len(), |e| start + e);
        i = (end + 1).min(raw.len());
        &raw[start..end]
      }
      _ => {
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
          i += 1;
        }
        &raw[start..i]
      }
    };
    attrs.push(Attr { name: name.to_string(), value: Some(decode_entities(value)) });
  }
  attrs
}

#[cfg(test)]
mod tests;
