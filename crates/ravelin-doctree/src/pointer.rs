//! JSON-Pointer fragments (`#/a/b~1c`) translated into node-tree queries.

use std::fmt;

use crate::error::DocError;
use crate::node::Node;

/// A parsed pointer query. Renders in bracket notation (`$['a']['b']`) so
/// segments containing `.` stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    segments: Vec<String>,
}

/// Translate a `#`-prefixed JSON-Pointer fragment into a [`PathQuery`].
///
/// `""`, `"#"` and `"#/"` all address the document root. Anything not
/// starting with `#` is a relative pointer, which is not supported.
pub fn json_pointer_to_path(pointer: &str) -> Result<PathQuery, DocError> {
    let trimmed = pointer.trim();
    if trimmed.is_empty() || trimmed == "#" || trimmed == "#/" {
        return Ok(PathQuery {
            segments: Vec::new(),
        });
    }

    if !trimmed.starts_with("#/") {
        return Err(DocError::ReferenceSyntax(format!(
            "relative JSON Pointer '{pointer}' is not supported"
        )));
    }

    // undo pointer escaping; ~1 strictly before ~0
    let segments = trimmed[2..]
        .split('/')
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect();
    Ok(PathQuery { segments })
}

impl PathQuery {
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Dotted rendering (`$.a.b`) used for in-document paths in cycle
    /// reports and error messages.
    pub fn dotted(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            out.push('.');
            out.push_str(segment);
        }
        out
    }

    /// Resolve the query against a tree. Exactly one node must match:
    /// zero matches is a missing reference, several (possible with
    /// duplicate mapping keys) is an ambiguous one. `reference` is the
    /// original `$ref` string, used for error context.
    pub fn locate<'a>(&self, root: &'a Node, reference: &str) -> Result<&'a Node, DocError> {
        let mut matches = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in matches {
                collect_segment_matches(node, segment, &mut next);
            }
            matches = next;
        }

        match matches.as_slice() {
            [] => Err(DocError::ReferenceNotFound {
                reference: reference.to_string(),
            }),
            [single] => Ok(*single),
            _ => Err(DocError::AmbiguousReference {
                reference: reference.to_string(),
            }),
        }
    }
}

fn collect_segment_matches<'a>(node: &'a Node, segment: &str, out: &mut Vec<&'a Node>) {
    match node {
        Node::Mapping(entries) => {
            for (key, value) in entries {
                if key.as_scalar() == Some(segment) {
                    out.push(value);
                }
            }
        }
        Node::Sequence(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    out.push(item);
                }
                return;
            }
            // the XML-hoisted list shape: a sequence of single-entry maps
            for item in items {
                if let Node::Mapping(entries) = item {
                    if let [(key, value)] = entries.as_slice() {
                        if key.as_scalar() == Some(segment) {
                            out.push(value);
                        }
                    }
                }
            }
        }
        Node::Scalar(_) => {}
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            write!(f, "['{segment}']")?;
        }
        Ok(())
    }
}
