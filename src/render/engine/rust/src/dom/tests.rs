/* src/render/engine/rust/src/dom/tests.rs */

use super::*;

fn roundtrip(html: &str) {
  assert_eq!(Document::parse(html).to_html(), html, "roundtrip failed for: {html}");
}

#[test]
fn roundtrip_simple_element() {
  roundtrip("<div>hello</div>");
}

#[test]
fn roundtrip_nested() {
  roundtrip("<div><span>inner</span></div>");
}

#[test]
fn roundtrip_self_closing_and_void() {
  roundtrip("<img/>");
  roundtrip("<br>");
  roundtrip(r#"<p>a<br>b<input type="text"></p>"#);
}

#[test]
fn roundtrip_with_attrs() {
  roundtrip(r#"<div class="red" id="x">text</div>"#);
  roundtrip("<input disabled>");
}

#[test]
fn roundtrip_comment() {
  roundtrip("<!-- note -->");
  roundtrip(r#"<div>text<!--comment--><img/><span class="a">inner</span>tail</div>"#);
}

#[test]
fn roundtrip_binding_attributes() {
  roundtrip(r#"<li *ngFor="let item of items; let i = index" (click)="select(i)" [class.active]="item.on">x</li>"#);
}

#[test]
fn roundtrip_raw_text_elements() {
  roundtrip("<style>a > b { color: red; }</style>");
  roundtrip("<script>if (a < b) { go(); }</script>");
}

#[test]
fn parse_structure() {
  let doc = Document::parse(r#"<div class="c"><span>text</span><!--note--></div>"#);
  let root_children = doc.children(doc.root());
  assert_eq!(root_children.len(), 1);
  let div = root_children[0];
  assert_eq!(doc.tag(div), Some("div"));
  assert_eq!(doc.attr(div, "class"), Some("c"));
  let children = doc.children(div);
  assert_eq!(children.len(), 2);
  assert_eq!(doc.tag(children[0]), Some("span"));
  assert_eq!(doc.text_content(children[0]), "text");
  assert_eq!(doc.kind(children[1]), &NodeKind::Comment("note".into()));
}

#[test]
fn no_spurious_text_nodes() {
  let doc = Document::parse("<span>A</span><span>B</span>");
  assert_eq!(doc.children(doc.root()).len(), 2);
  let doc = Document::parse("<div></div>");
  assert!(doc.children(doc.children(doc.root())[0]).is_empty());
}

#[test]
fn attribute_values_are_decoded() {
  let doc = Document::parse(r#"<p *ngIf="a &amp;&amp; b" title='x "y"'></p>"#);
  let p = doc.children(doc.root())[0];
  assert_eq!(doc.attr(p, "*ngIf"), Some("a && b"));
  assert_eq!(doc.attr(p, "title"), Some(r#"x "y""#));
  assert_eq!(doc.outer_html(p), r#"<p *ngIf="a &amp;&amp; b" title="x &quot;y&quot;"></p>"#);
}

#[test]
fn attribute_lookup_is_case_insensitive() {
  let doc = Document::parse(r#"<app-component-viewer componentid="5"></app-component-viewer>"#);
  let el = doc.children(doc.root())[0];
  assert_eq!(doc.attr(el, "componentId"), Some("5"));
}

#[test]
fn stray_closing_tag_is_dropped() {
  let doc = Document::parse("<div>a</span>b</div>");
  assert_eq!(doc.to_html(), "<div>ab</div>");
}

#[test]
fn unclosed_child_ends_at_parent_close() {
  let doc = Document::parse("<div><p>one</div><b>two</b>");
  assert_eq!(doc.to_html(), "<div><p>one</p></div><b>two</b>");
}

#[test]
fn lone_angle_bracket_is_text() {
  let doc = Document::parse("1 < 2");
  assert_eq!(doc.text_content(doc.root()), "1 < 2");
}

#[test]
fn set_and_remove_attributes() {
  let mut doc = Document::parse(r#"<a href="x" (click)="go()">link</a>"#);
  let a = doc.children(doc.root())[0];
  doc.set_attr(a, "href", Some("y".into()));
  doc.set_attr(a, "target", Some("_blank".into()));
  assert_eq!(doc.remove_attr(a, "(click)").map(|at| at.value), Some(Some("go()".into())));
  assert_eq!(doc.outer_html(a), r#"<a href="y" target="_blank">link</a>"#);
}

#[test]
fn replace_with_splices_in_order() {
  let mut doc = Document::parse("<ul><li>t</li><li>end</li></ul>");
  let ul = doc.children(doc.root())[0];
  let template = doc.children(ul)[0];
  let a = doc.clone_subtree(template);
  let b = doc.clone_subtree(template);
  doc.set_attr(b, "data-index", Some("1".into()));
  doc.replace_with(template, &[a, b]);
  assert_eq!(doc.outer_html(ul), r#"<ul><li>t</li><li data-index="1">t</li><li>end</li></ul>"#);
  assert!(!doc.is_attached(template));
  assert!(doc.is_attached(b));
}

#[test]
fn replace_with_nothing_removes() {
  let mut doc = Document::parse("<div><p>x</p><p>y</p></div>");
  let div = doc.children(doc.root())[0];
  let first = doc.children(div)[0];
  doc.replace_with(first, &[]);
  assert_eq!(doc.to_html(), "<div><p>y</p></div>");
}

#[test]
fn descendants_in_document_order() {
  let doc = Document::parse("<a><b><c></c></b><d></d></a>");
  let tags: Vec<_> = doc.descendants(doc.root()).into_iter().filter_map(|n| doc.tag(n)).collect();
  assert_eq!(tags, vec!["a", "b", "c", "d"]);
}

#[test]
fn import_and_append_html() {
  let mut doc = Document::parse(r#"<div id="host"></div>"#);
  let host = doc.children(doc.root())[0];
  let added = doc.append_html(host, "<b>1</b><i>2</i>");
  assert_eq!(added.len(), 2);
  assert_eq!(doc.inner_html(host), "<b>1</b><i>2</i>");
}

#[test]
fn inert_marks_follow_clones_and_removal() {
  let mut doc = Document::parse(r#"<p title="x"><b>y</b></p>"#);
  let p = doc.children(doc.root())[0];
  let b = doc.children(p)[0];
  doc.mark_inert(b);
  doc.mark_attr_inert(p, "TITLE");
  assert!(doc.is_attr_inert(p, "title"));

  let copy = doc.clone_subtree(p);
  assert!(doc.is_attr_inert(copy, "title"));
  assert!(doc.is_inert(doc.children(copy)[0]));
  assert!(!doc.is_inert(copy));

  doc.remove_attr(p, "title");
  assert!(!doc.is_attr_inert(p, "title"));
}
