/* src/render/engine/rust/src/helpers.rs */

// HTML boolean attributes: present means true, absent means false.
// A truthy binding renders `attr=""`, a falsy one removes the attribute.
const HTML_BOOLEAN_ATTRS: &[&str] = &[
  "allowfullscreen",
  "async",
  "autofocus",
  "autoplay",
  "checked",
  "controls",
  "default",
  "defer",
  "disabled",
  "formnovalidate",
  "hidden",
  "loop",
  "multiple",
  "muted",
  "nomodule",
  "novalidate",
  "open",
  "readonly",
  "required",
  "reversed",
  "selected",
];

const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
  "wbr",
];

pub(crate) fn is_html_boolean_attr(name: &str) -> bool {
  HTML_BOOLEAN_ATTRS.iter().any(|a| a.eq_ignore_ascii_case(name))
}

pub(crate) fn is_void_element(tag: &str) -> bool {
  VOID_ELEMENTS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Elements whose content is raw text up to the matching close tag.
pub(crate) fn is_raw_text_element(tag: &str) -> bool {
  tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      c => out.push(c),
    }
  }
  out
}

pub(crate) fn escape_attr(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '"' => out.push_str("&quot;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      c => out.push(c),
    }
  }
  out
}

/// Decode the handful of named and numeric entities authors actually use.
/// Unknown entities pass through untouched.
pub(crate) fn decode_entities(s: &str) -> String {
  if !s.contains('&') {
    return s.to_string();
  }
  let mut out = String::with_capacity(s.len());
  let mut rest = s;
  while let Some(amp) = rest.find('&') {
    out.push_str(&rest[..amp]);
    rest = &rest[amp..];
    let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
      out.push('&');
      rest = &rest[1..];
      continue;
    };
    let entity = &rest[1..semi];
    let decoded = match entity {
      "amp" => Some('&'),
      "lt" => Some('<'),
      "gt" => Some('>'),
      "quot" => Some('"'),
      "apos" => Some('\''),
      "nbsp" => Some('\u{a0}'),
      _ => entity.strip_prefix('#').and_then(|num| {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
          Some(hex) => u32::from_str_radix(hex, 16).ok(),
          None => num.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
      }),
    };
    match decoded {
      Some(c) => {
        out.push(c);
        rest = &rest[semi + 1..];
      }
      None => {
        out.push('&');
        rest = &rest[1..];
      }
    }
  }
  out.push_str(rest);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escape_html_special_chars() {
    assert_eq!(escape_html("<>&\"'"), "&lt;&gt;&amp;&quot;&#x27;");
  }

  #[test]
  fn escape_html_safe_string() {
    assert_eq!(escape_html("hello world"), "hello world");
    assert_eq!(escape_html(""), "");
  }

  #[test]
  fn escape_attr_keeps_single_quotes() {
    assert_eq!(escape_attr(r#"a "b" & 'c'"#), "a &quot;b&quot; &amp; 'c'");
  }

  #[test]
  fn decode_known_entities() {
    assert_eq!(decode_entities("a &amp;&amp; b &lt; c"), "a && b < c");
    assert_eq!(decode_entities("&#39;x&#x27;"), "'x'");
  }

  #[test]
  fn decode_leaves_unknown_entities() {
    assert_eq!(decode_entities("fish & chips"), "fish & chips");
    assert_eq!(decode_entities("&bogus;"), "&bogus;");
  }

  #[test]
  fn attribute_classification() {
    assert!(is_html_boolean_attr("disabled"));
    assert!(is_html_boolean_attr("Checked"));
    assert!(!is_html_boolean_attr("value"));
    assert!(is_void_element("br"));
    assert!(!is_void_element("div"));
    assert!(is_raw_text_element("STYLE"));
  }
}
