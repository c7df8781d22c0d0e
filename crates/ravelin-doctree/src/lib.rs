//! Structural document toolkit for API-gateway proxy bundles.
//!
//! Everything revolves around one tree type, [`Node`]: an insertion-ordered
//! scalar/mapping/sequence model that both the XML and YAML codecs target.
//! On top of it sit JSON-Pointer lookups ([`json_pointer_to_path`]), a
//! parse-once file loader ([`FileCache`]), and a multi-file `$ref`
//! resolution engine ([`resolve_refs`]) with cycle detection.
//!
//! ```
//! use ravelin_doctree::{xml_text_to_yaml_text, yaml_text_to_xml_text};
//!
//! let yaml = xml_text_to_yaml_text("<Quota name=\"q\"><Interval>1</Interval></Quota>")?;
//! let xml = yaml_text_to_xml_text(&yaml)?;
//! assert!(xml.contains("<Quota name=\"q\">"));
//! # Ok::<(), ravelin_doctree::DocError>(())
//! ```

pub mod error;
pub mod json;
pub mod loader;
pub mod node;
pub mod pointer;
pub mod resolver;
pub mod xml;
pub mod yaml;

pub use error::{Cycle, DocError};
pub use json::node_to_json_text;
pub use loader::FileCache;
pub use node::{Node, ATTRIBUTE_PREFIX, REF_KEY, SPLICE_PREFIX, TEXT_KEY};
pub use pointer::{json_pointer_to_path, PathQuery};
pub use resolver::{resolve_refs, resolve_refs_with_cache, ResolveOptions};
pub use xml::{node_to_xml_text, xml_to_node};
pub use yaml::{node_to_yaml_text, xml_text_to_yaml_text, yaml_text_to_xml_text, yaml_to_node};
