use std::path::PathBuf;

use thiserror::Error;

/// One detected reference cycle: the file it loops back into (relative to
/// the root document's directory) and the in-document path that was being
/// dereferenced when the loop closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub file: String,
    pub path: String,
}

/// Errors produced by the codecs and the reference resolver.
#[derive(Debug, Error)]
pub enum DocError {
    /// Malformed YAML at the text boundary.
    #[error("could not parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Malformed XML at the text boundary.
    #[error("could not parse XML: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// Well-formed per the reader, but not a usable document (e.g. no root element).
    #[error("malformed XML document: {0}")]
    XmlMalformed(String),

    /// Node shape that has no XML representation.
    #[error("cannot encode node as XML: {0}")]
    XmlEncode(String),

    /// A `$ref` value that is not a valid locator or pointer.
    #[error("invalid reference syntax: {0}")]
    ReferenceSyntax(String),

    /// Pointer lookup matched no node.
    #[error("no node found at reference '{reference}'")]
    ReferenceNotFound { reference: String },

    /// Pointer lookup matched more than one node.
    #[error("more than one node found at reference '{reference}'")]
    AmbiguousReference { reference: String },

    /// A referenced file could not be read.
    #[error("could not load {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A referenced file could not be parsed.
    #[error("could not parse {}: {source}", path.display())]
    FileParse {
        path: PathBuf,
        #[source]
        source: Box<DocError>,
    },

    /// JSON serialization failure.
    #[error("could not encode JSON: {0}")]
    JsonEncode(#[from] serde_json::Error),

    /// Every cycle found during one full resolution pass, reported together.
    #[error("{}", format_cycles(.0))]
    CyclicRefs(Vec<Cycle>),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_cycles(cycles: &[Cycle]) -> String {
    cycles
        .iter()
        .map(|c| format!("cyclic reference at {}:{}", c.file, c.path))
        .collect::<Vec<_>>()
        .join("\n")
}
