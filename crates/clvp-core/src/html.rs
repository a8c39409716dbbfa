//! HTML parsing into the owned [`Element`] tree.
//!
//! Parsing goes through `html5ever` into an `RcDom` and is then copied into
//! owned nodes so the live page can be mutated without `RefCell` plumbing.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::dom::{Element, Node};
use crate::DomError;

/// Parses a full HTML document and returns its `<html>` element.
///
/// html5ever recovers from malformed markup the way browsers do, so the only
/// failure is a document without a root element.
///
/// # Errors
///
/// Returns [`DomError::MissingRoot`] if the parsed document has no `<html>`
/// element.
pub fn parse_html(html: &str) -> Result<Element, DomError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let root = dom
        .document
        .children
        .borrow()
        .iter()
        .find_map(|handle| match convert(handle) {
            Some(Node::Element(el)) if el.tag == "html" => Some(el),
            _ => None,
        });
    root.ok_or(DomError::MissingRoot)
}

fn convert(handle: &Handle) -> Option<Node> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut el = Element::new(&name.local);
            for attr in attrs.borrow().iter() {
                el.set_attr(&attr.name.local, &attr.value);
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(child) {
                    el.children.push(node);
                }
            }
            Some(Node::Element(el))
        }
        NodeData::Text { contents } => Some(Node::Text(contents.borrow().to_string())),
        _ => None,
    }
}
