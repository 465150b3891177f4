//! HTML parsing and serialization for the server-render round trip.
//!
//! Parsing goes through html5ever's reference tree builder ([`RcDom`]) and
//! converts the result into a [`Document`]. Serialization follows the HTML
//! fragment serialization algorithm closely enough that binding attributes
//! survive render, string, parse unchanged.

use bindery_core::{BinderyError, Document, NodeId, dom::NodeData};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

const VOID_ELEMENTS: [&str; 16] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "source", "track",
];

const RAW_TEXT_ELEMENTS: [&str; 7] = [
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
    "script",
    "style",
];

// ============================================================================
// Parsing
// ============================================================================

/// Parse a complete HTML document.
pub fn parse_document(html: &str) -> Result<Document, BinderyError> {
    let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(html);
    let document = Document::empty();
    convert_children(&dom.document, &document, NodeId::DOCUMENT)?;
    tracing::debug!(nodes = document.node_count(), "parsed document");
    Ok(document)
}

/// Parse `html` in body context and append the resulting nodes to `parent`.
///
/// Returns the top-level nodes inserted, in order.
pub fn parse_fragment_into(
    document: &Document,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, BinderyError> {
    let dom = html5ever::parse_document(RcDom::default(), Default::default()).one(html);
    let body = find_element(&dom.document, "body")
        .ok_or_else(|| BinderyError::Parse("fragment produced no body".to_string()))?;
    let mut inserted = Vec::new();
    for child in body.children.borrow().iter() {
        if let Some(node) = convert(child, document, parent)? {
            inserted.push(node);
        }
    }
    Ok(inserted)
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data
        && &*name.local == tag
    {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn convert_children(
    handle: &Handle,
    document: &Document,
    parent: NodeId,
) -> Result<(), BinderyError> {
    for child in handle.children.borrow().iter() {
        convert(child, document, parent)?;
    }
    Ok(())
}

fn convert(
    handle: &Handle,
    document: &Document,
    parent: NodeId,
) -> Result<Option<NodeId>, BinderyError> {
    let node = match &handle.data {
        RcNodeData::Document => {
            convert_children(handle, document, parent)?;
            return Ok(None);
        }
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => return Ok(None),
        RcNodeData::Text { contents } => document.create_text(&contents.borrow()),
        RcNodeData::Comment { contents } => document.create_comment(contents),
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let node = document.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                document.set_attribute(node, &attr.name.local, &attr.value);
            }
            document.append_child(parent, node)?;
            // Template children live in a separate fragment.
            match template_contents.borrow().as_ref() {
                Some(contents) => convert_children(contents, document, node)?,
                None => convert_children(handle, document, node)?,
            }
            return Ok(Some(node));
        }
    };
    document.append_child(parent, node)?;
    Ok(Some(node))
}

// ============================================================================
// Serialization
// ============================================================================

/// Serialize `node` and its subtree. The document node serializes with a
/// doctype.
pub fn serialize(document: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(document, node, false, &mut out);
    out
}

/// Serialize the children of `node`.
pub fn inner_html(document: &Document, node: NodeId) -> String {
    let raw = document
        .tag_name(node)
        .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag.as_str()));
    let mut out = String::new();
    for child in document.children(node) {
        write_node(document, child, raw, &mut out);
    }
    out
}

fn write_node(document: &Document, node: NodeId, raw_text: bool, out: &mut String) {
    let Some(data) = document.node_data(node) else {
        return;
    };
    match data {
        NodeData::Document => {
            out.push_str("<!DOCTYPE html>");
            for child in document.children(node) {
                write_node(document, child, false, out);
            }
        }
        NodeData::Text(text) if raw_text => out.push_str(&text),
        NodeData::Text(text) => escape_text(&text, out),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&text);
            out.push_str("-->");
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attribute(&attr.value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
            for child in document.children(node) {
                write_node(document, child, raw, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}
