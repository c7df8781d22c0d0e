//! JSON emission for node trees.
//!
//! Outputs named `*.json` share the YAML scalar re-typing rules, so a
//! resolved document serializes the same values whichever syntax it lands
//! in. JSON mapping keys must be strings; non-scalar keys cannot occur in
//! trees built by the codecs, but if handed one we render it lossily via
//! its debug form rather than fail a whole document.

use serde_json::{Map, Value};

use crate::error::DocError;
use crate::node::Node;

/// Serialize a node tree as pretty-printed JSON text.
pub fn node_to_json_text(node: &Node) -> Result<String, DocError> {
    let mut text = serde_json::to_string_pretty(&node_to_value(node))?;
    text.push('\n');
    Ok(text)
}

fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Scalar(s) => scalar_to_value(s),
        Node::Sequence(items) => Value::Array(items.iter().map(node_to_value).collect()),
        Node::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key.as_scalar() {
                    Some(s) => s.to_string(),
                    None => format!("{key:?}"),
                };
                map.insert(key, node_to_value(value));
            }
            Value::Object(map)
        }
    }
}

/// Same canonical-form rule as the YAML emitter: re-type only when the
/// typed value writes back as the original text.
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
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text.to_string())
}
