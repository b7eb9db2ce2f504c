/* src/render/engine/rust/src/placeholder.rs */

use std::sync::OnceLock;

use cms_api::ComponentId;
use regex::Regex;
use serde::Serialize;

pub const PLACEHOLDER_TAG: &str = "app-component-viewer";

/// A component placeholder found in stored page HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentPlaceholder {
  pub component_id: ComponentId,
  pub raw_match_text: String,
  /// Byte offset of the match in the source HTML.
  pub offset: usize,
}

fn placeholder_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(concat!(
      r#"(?i)<app-component-viewer\b((?:[^>"']|"[^"]*"|'[^']*')*?)"#,
      r"(?:/>|>(?s:.*?)</app-component-viewer\s*>)",
    ))
    .unwrap()
  })
}

fn bound_id_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?i)\[componentId\]\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn plain_id_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"(?i)(?:^|\s)componentId\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

/// Parse a placeholder id: ASCII digits only, surrounding whitespace allowed.
pub fn parse_component_id(raw: &str) -> Option<ComponentId> {
  let digits = raw.trim();
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

fn captured_id(re: &Regex, attrs: &str) -> Option<String> {
  let caps = re.captures(attrs)?;
  caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

/// Lexically scan `html` for component placeholders, in document order.
///
/// A placeholder may be self-closing or carry fallback content before its
/// closing tag; quoted attribute values may contain `>`.
///
/// Both the bound (`[componentId]="42"`) and plain (`componentId="42"`)
/// syntaxes are recognized, the bound one taking precedence when a tag
/// carries both. Tags with a non-numeric id are dropped; duplicates are kept.
pub fn extract_placeholders(html: &str) -> Vec<ComponentPlaceholder> {
  placeholder_re()
    .captures_iter(html)
    .filter_map(|caps| {
      let whole = caps.get(0)?;
      let attrs = caps.get(1).map_or("", |m| m.as_str());
      let raw_id = captured_id(bound_id_re(), attrs).or_else(|| captured_id(plain_id_re(), attrs))?;
      match parse_component_id(&raw_id) {
        Some(component_id) => Some(ComponentPlaceholder {
          component_id,
          raw_match_text: whole.as_str().to_string(),
          offset: whole.start(),
        }),
        None => {
          tracing::debug!(raw_id = %raw_id, "ignoring placeholder with malformed component id");
          None
        }
      }
    })
    .collect()
}

/// Distinct component ids in first-occurrence order.
pub fn distinct_component_ids(placeholders: &[ComponentPlaceholder]) -> Vec<ComponentId> {
  let mut seen = Vec::new();
  for p in placeholders {
    if !seen.contains(&p.component_id) {
      seen.push(p.component_id);
    }
  }
  seen
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ids(html: &str) -> Vec<ComponentId> {
    extract_placeholders(html).into_iter().map(|p| p.component_id).collect()
  }

  #[test]
  fn bound_syntax() {
    let html = r#"<app-component-viewer [componentId]="12"></app-component-viewer>"#;
    let found = extract_placeholders(html);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].component_id, 12);
    assert_eq!(found[0].raw_match_text, html);
    assert_eq!(found[0].offset, 0);
  }

  #[test]
  fn plain_syntax_with_extra_attributes() {
    let html = r#"<p>x</p><app-component-viewer componentId="7" class="wide"></app-component-viewer>"#;
    let found = extract_placeholders(html);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].component_id, 7);
    assert_eq!(found[0].offset, 8);
  }

  #[test]
  fn mixed_syntaxes_in_document_order() {
    let html = concat!(
      r#"<app-component-viewer componentId="3"></app-component-viewer>"#,
      "<div>between</div>",
      r#"<app-component-viewer [componentId]="1"></app-component-viewer>"#,
      r#"<app-component-viewer componentId="2"></app-component-viewer>"#,
    );
    assert_eq!(ids(html), vec![3, 1, 2]);
  }

  #[test]
  fn duplicates_preserved() {
    let tag = r#"<app-component-viewer componentId="9"></app-component-viewer>"#;
    let html = format!("{tag}<hr>{tag}");
    let found = extract_placeholders(&html);
    assert_eq!(ids(&html), vec![9, 9]);
    assert_ne!(found[0].offset, found[1].offset);
    assert_eq!(distinct_component_ids(&found), vec![9]);
  }

  #[test]
  fn malformed_ids_excluded() {
    let html = concat!(
      r#"<app-component-viewer componentId="abc"></app-component-viewer>"#,
      r#"<app-component-viewer componentId="-4"></app-component-viewer>"#,
      r#"<app-component-viewer componentId=""></app-component-viewer>"#,
      r#"<app-component-viewer [componentId]="1.5"></app-component-viewer>"#,
      r#"<app-component-viewer componentId="5"></app-component-viewer>"#,
    );
    assert_eq!(ids(html), vec![5]);
  }

  #[test]
  fn no_placeholders_is_empty() {
    assert!(extract_placeholders("<div>plain page</div>").is_empty());
    assert!(extract_placeholders("").is_empty());
  }

  #[test]
  fn bound_wins_over_plain() {
    let html = r#"<app-component-viewer componentId="1" [componentId]="2"></app-component-viewer>"#;
    assert_eq!(ids(html), vec![2]);
  }

  #[test]
  fn data_attribute_is_not_an_id() {
    let html = r#"<app-component-viewer data-componentId="4"></app-component-viewer>"#;
    assert!(ids(html).is_empty());
  }

  #[test]
  fn placeholder_with_content() {
    let html = r#"<app-component-viewer componentId="3">Loading</app-component-viewer><p>after</p>"#;
    let found = extract_placeholders(html);
    assert_eq!(ids(html), vec![3]);
    assert_eq!(found[0].raw_match_text, r#"<app-component-viewer componentId="3">Loading</app-component-viewer>"#);

    let multiline = "<app-component-viewer componentId=\"4\">\n  <span>...</span>\n</app-component-viewer>";
    assert_eq!(ids(multiline), vec![4]);
  }

  #[test]
  fn quoted_gt_and_self_closing() {
    let html = concat!(
      r#"<app-component-viewer title="a > b" componentId="8"></app-component-viewer>"#,
      r#"<app-component-viewer componentId="9"/><p>x</p>"#,
      r#"<app-component-viewer componentId="10"></app-component-viewer>"#,
    );
    assert_eq!(ids(html), vec![8, 9, 10]);
  }

  #[test]
  fn id_parsing() {
    assert_eq!(parse_component_id(" 42 "), Some(42));
    assert_eq!(parse_component_id("+1"), None);
    assert_eq!(parse_component_id("99999999999999999999999"), None);
  }
}
