//! YAML text ↔ [`Node`] codec, plus the full text-to-text pipelines.
//!
//! Thin wrappers over serde_yaml: its mapping type preserves insertion
//! order, which is all the node model needs. Scalars are held as strings;
//! emission re-types plain scalars so numbers, booleans and nulls come
//! back out unquoted.

use serde_yaml::Value;

use crate::error::DocError;
use crate::node::Node;
use crate::xml::{node_to_xml_text, xml_to_node};

/// Parse YAML (or JSON, which is a YAML subset) into a node tree.
pub fn yaml_to_node(text: &str) -> Result<Node, DocError> {
    let value: Value = serde_yaml::from_str(text)?;
    Ok(value_to_node(&value))
}

/// Serialize a node tree as block-style YAML text.
pub fn node_to_yaml_text(node: &Node) -> Result<String, DocError> {
    Ok(serde_yaml::to_string(&node_to_value(node))?)
}

/// XML text straight to YAML text.
pub fn xml_text_to_yaml_text(text: &str) -> Result<String, DocError> {
    node_to_yaml_text(&xml_to_node(text)?)
}

/// YAML text straight to XML text.
pub fn yaml_text_to_xml_text(text: &str) -> Result<String, DocError> {
    node_to_xml_text(&yaml_to_node(text)?)
}

fn value_to_node(value: &Value) -> Node {
    match value {
        Value::Null => Node::Scalar(String::new()),
        Value::Bool(b) => Node::Scalar(b.to_string()),
        Value::Number(n) => Node::Scalar(n.to_string()),
        Value::String(s) => Node::Scalar(s.clone()),
        Value::Sequence(items) => Node::Sequence(items.iter().map(value_to_node).collect()),
        Value::Mapping(entries) => Node::Mapping(
            entries
                .iter()
                .map(|(k, v)| (value_to_node(k), value_to_node(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => value_to_node(&tagged.value),
    }
}

fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Scalar(s) => scalar_to_value(s),
        Node::Sequence(items) => Value::Sequence(items.iter().map(node_to_value).collect()),
        Node::Mapping(entries) => Value::Mapping(
            entries
                .iter()
                .map(|(k, v)| (node_to_value(k), node_to_value(v)))
                .collect(),
        ),
    }
}

/// Re-type a scalar only when the typed form writes back identically, so
/// strings like `01` or `1.10` stay strings.
fn scalar_to_value(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if text == "true" || text == "false" {
        return Value::Bool(text == "true");
    }
    if let Ok(n) = text.parse::<i64>() {
        if n.to_string() == text {
            return Value::Number(n.into());
        }
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.to_string() == text {
            return Value::Number(serde_yaml::Number::from(f));
        }
    }
    Value::String(text.to_string())
}
