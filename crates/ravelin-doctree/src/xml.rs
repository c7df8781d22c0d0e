//! XML ↔ [`Node`] structural codec.
//!
//! An XML element maps to the node model with a small set of conventions:
//! attributes become `.`-prefixed mapping keys, character data lives under
//! the [`TEXT_KEY`] marker when it cannot stand alone, and a sibling set
//! containing any repeated tag collapses to a sequence of single-entry
//! mappings. Repetition anywhere in the sibling set forces list form for
//! the whole set, so `<a/><a/><b/>` and `<a/><a/>` both become sequences.
//!
//! Interleaved mixed content is outside the model: text runs in an element
//! that also has child elements are dropped, and multiple text runs in a
//! text-only element are concatenated before trimming. Neither case is an
//! error.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;

use crate::error::DocError;
use crate::node::{Node, ATTRIBUTE_PREFIX, SPLICE_PREFIX, TEXT_KEY};

/// Parsed XML element, children kept in document order.
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Content>,
}

enum Content {
    Element(Element),
    Text(String),
}

/// Parse XML text into a one-entry mapping `{root_tag: value}`.
pub fn xml_to_node(text: &str) -> Result<Node, DocError> {
    let root = parse_document(text)?;
    let (key, value) = element_to_entry(&root);
    Ok(Node::Mapping(vec![(key, value)]))
}

/// Serialize a node tree back to XML text with a document declaration and
/// 2-space indentation. The root must be a mapping; its keys become the
/// document's top-level elements.
pub fn node_to_xml_text(node: &Node) -> Result<String, DocError> {
    if !matches!(node, Node::Mapping(_)) {
        return Err(DocError::XmlEncode(
            "document root must be a mapping".to_string(),
        ));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_content(&mut writer, node)?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|e| DocError::XmlEncode(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

fn parse_document(text: &str) -> Result<Element, DocError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DocError::XmlMalformed("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Content::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Content::Text(String::from_utf8_lossy(&data).into_owned()));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    root.ok_or_else(|| DocError::XmlMalformed("document has no root element".to_string()))
}

fn element_from_start(start: &BytesStart) -> Result<Element, DocError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Content::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocError::XmlMalformed(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

/// Trimmed concatenation of the element's text runs, or `None` if the
/// element has any child element (text in mixed content is dropped).
fn character_data(element: &Element) -> Option<String> {
    let mut text = String::new();
    for child in &element.children {
        match child {
            Content::Text(run) => text.push_str(run),
            Content::Element(_) => return None,
        }
    }
    Some(text.trim().to_string())
}

fn element_to_entry(element: &Element) -> (Node, Node) {
    let key = Node::scalar(&element.name);

    let attr_entries: Vec<(Node, Node)> = element
        .attributes
        .iter()
        .map(|(name, value)| {
            (
                Node::scalar(format!("{ATTRIBUTE_PREFIX}{name}")),
                Node::scalar(value),
            )
        })
        .collect();

    if let Some(text) = character_data(element) {
        if !attr_entries.is_empty() {
            let mut entries = attr_entries;
            if !text.is_empty() {
                entries.push((Node::scalar(TEXT_KEY), Node::Scalar(text)));
            }
            return (key, Node::Mapping(entries));
        }
        if text.is_empty() {
            return (key, Node::Mapping(Vec::new()));
        }
        return (key, Node::Scalar(text));
    }

    let mut children: Vec<(Node, Node)> = Vec::new();
    let mut seen = HashSet::new();
    let mut all_unique = true;
    for child in &element.children {
        if let Content::Element(child_element) = child {
            if !seen.insert(child_element.name.clone()) {
                all_unique = false;
            }
            children.push(element_to_entry(child_element));
        }
    }

    if !all_unique {
        // repetition anywhere makes the whole sibling set a sequence
        let sequence = Node::Sequence(
            children
                .into_iter()
                .map(|(child_key, child_value)| Node::Mapping(vec![(child_key, child_value)]))
                .collect(),
        );
        if attr_entries.is_empty() {
            return (key, sequence);
        }
        let mut entries = attr_entries;
        entries.push((Node::scalar(TEXT_KEY), sequence));
        return (key, Node::Mapping(entries));
    }

    // unique children sit flat next to any attributes
    let mut entries = attr_entries;
    entries.extend(children);
    (key, Node::Mapping(entries))
}

fn is_attribute_key(key: &str) -> bool {
    key.len() > 1 && key.starts_with(ATTRIBUTE_PREFIX)
}

/// Emit a node into the current element: scalars become text, sequences
/// splice item by item, mapping keys become attributes, spliced values,
/// or child elements according to their prefix.
fn write_content(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), DocError> {
    match node {
        Node::Scalar(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        Node::Sequence(items) => {
            for item in items {
                write_content(writer, item)?;
            }
        }
        Node::Mapping(entries) => {
            for (key_node, value) in entries {
                let Some(key) = key_node.as_scalar() else {
                    continue;
                };
                if is_attribute_key(key) {
                    continue;
                }
                if key.starts_with(SPLICE_PREFIX) {
                    write_content(writer, value)?;
                } else {
                    write_element(writer, key, value)?;
                }
            }
        }
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Node) -> Result<(), DocError> {
    let mut start = BytesStart::new(name);
    if let Node::Mapping(entries) = value {
        for (key_node, attr_value) in entries {
            if let (Some(key), Some(text)) = (key_node.as_scalar(), attr_value.as_scalar()) {
                if is_attribute_key(key) {
                    start.push_attribute((&key[1..], text));
                }
            }
        }
    }

    if has_element_content(value) {
        writer.write_event(Event::Start(start))?;
        write_content(writer, value)?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    } else {
        writer.write_event(Event::Empty(start))?;
    }
    Ok(())
}

fn has_element_content(node: &Node) -> bool {
    match node {
        Node::Scalar(text) => !text.is_empty(),
        Node::Sequence(items) => !items.is_empty(),
        Node::Mapping(entries) => entries.iter().any(|(key_node, value)| match key_node.as_scalar()
        {
            Some(key) if is_attribute_key(key) => false,
            Some(key) if key.starts_with(SPLICE_PREFIX) => has_element_content(value),
            Some(_) => true,
            None => false,
        }),
    }
}
