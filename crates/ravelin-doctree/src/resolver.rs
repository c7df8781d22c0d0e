//! Multi-file `$ref` resolution with cycle detection.
//!
//! Resolution is a structural walk that rebuilds the tree, replacing each
//! reference node with a deep copy of its resolved target. Cycles are not
//! fatal per-occurrence: every cycle is recorded and replaced with a
//! placeholder, and the full set is reported at the end of the pass (or
//! kept as placeholders when cycles are allowed).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Cycle, DocError};
use crate::loader::{absolutize, FileCache};
use crate::node::Node;
use crate::pointer::{json_pointer_to_path, PathQuery};

/// Knobs for a resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Replace cyclic references with placeholders instead of failing.
    pub allow_cycles: bool,
    /// When false, references pointing back into the root document are
    /// left in place. Used when the root document is being assembled and
    /// its own fragments must stay live.
    pub resolve_root_refs: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            allow_cycles: false,
            resolve_root_refs: true,
        }
    }
}

/// Resolve every `$ref` reachable from `root`, reading referenced files
/// relative to `root_file`. Returns the rebuilt tree.
pub fn resolve_refs(
    root: &Node,
    root_file: &Path,
    options: &ResolveOptions,
) -> Result<Node, DocError> {
    let mut cache = FileCache::new();
    resolve_refs_with_cache(root, root_file, options, &mut cache)
}

/// Like [`resolve_refs`], but sharing a caller-owned [`FileCache`] so a
/// batch of documents reuses parses.
pub fn resolve_refs_with_cache(
    root: &Node,
    root_file: &Path,
    options: &ResolveOptions,
    cache: &mut FileCache,
) -> Result<Node, DocError> {
    let root_file = absolutize(root_file)?;
    let root_dir = root_file.parent().map(Path::to_path_buf).unwrap_or_default();
    debug!(file = %root_file.display(), "resolving references");

    let mut walker = Walker {
        cache,
        cycles: Vec::new(),
        root_file,
        root_dir,
        resolve_root_refs: options.resolve_root_refs,
    };
    let root_path = walker.root_file.clone();
    let resolved = walker.resolve(root, "$", &root_path, &[])?;

    if !walker.cycles.is_empty() && !options.allow_cycles {
        return Err(DocError::CyclicRefs(walker.cycles));
    }
    Ok(resolved)
}

/// One (file, in-document path) pair currently being expanded. The walk
/// carries a frame-local copy of the active list, so unwinding needs no
/// cleanup and sibling branches cannot see each other's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveRef {
    file: PathBuf,
    path: String,
}

struct Walker<'a> {
    cache: &'a mut FileCache,
    cycles: Vec<Cycle>,
    root_file: PathBuf,
    root_dir: PathBuf,
    resolve_root_refs: bool,
}

impl Walker<'_> {
    fn resolve(
        &mut self,
        node: &Node,
        doc_path: &str,
        current_file: &Path,
        active: &[ActiveRef],
    ) -> Result<Node, DocError> {
        let key = ActiveRef {
            file: current_file.to_path_buf(),
            path: doc_path.to_string(),
        };
        if active.contains(&key) {
            return Ok(self.record_cycle(key, active));
        }
        let mut active = active.to_vec();
        active.push(key);

        if node.is_ref() {
            return self.resolve_ref_node(node, current_file, &active);
        }

        match node {
            Node::Scalar(_) => Ok(node.clone()),
            Node::Sequence(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let child_path = format!("{doc_path}.{index}");
                    resolved.push(self.resolve(item, &child_path, current_file, &active)?);
                }
                Ok(Node::Sequence(resolved))
            }
            Node::Mapping(entries) => {
                let mut resolved = Vec::with_capacity(entries.len());
                for (entry_key, value) in entries {
                    let child_path = match entry_key.as_scalar() {
                        Some(name) => format!("{doc_path}.{name}"),
                        None => format!("{doc_path}.?"),
                    };
                    let value = self.resolve(value, &child_path, current_file, &active)?;
                    resolved.push((entry_key.clone(), value));
                }
                Ok(Node::Mapping(resolved))
            }
        }
    }

    fn resolve_ref_node(
        &mut self,
        node: &Node,
        current_file: &Path,
        active: &[ActiveRef],
    ) -> Result<Node, DocError> {
        let reference = node
            .ref_target()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                DocError::ReferenceSyntax(format!(
                    "reference in {} is not a non-empty string",
                    current_file.display()
                ))
            })?;

        let locator = parse_locator(reference)?;
        let ref_file = match &locator.file {
            Some(location) => {
                let location = Path::new(location);
                if location.is_absolute() {
                    location.to_path_buf()
                } else {
                    current_file
                        .parent()
                        .unwrap_or_else(|| Path::new(""))
                        .join(location)
                }
            }
            None => current_file.to_path_buf(),
        };
        let ref_file = absolutize(&ref_file)?;

        if !self.resolve_root_refs && ref_file == self.root_file {
            return Ok(node.clone());
        }

        debug!(reference, file = %ref_file.display(), "dereferencing");
        let target = {
            let file_root = self.cache.load(&ref_file)?;
            locator.query.locate(file_root, reference)?.clone()
        };
        self.resolve(&target, &locator.query.dotted(), &ref_file, active)
    }

    /// `repeat` is the (file, path) pair found twice on the active list.
    /// The report names that file and the in-document path of the most
    /// recent expansion, then the walk continues with a placeholder.
    fn record_cycle(&mut self, repeat: ActiveRef, active: &[ActiveRef]) -> Node {
        let file = relative_to(&repeat.file, &self.root_dir);
        let path = active
            .last()
            .map_or_else(|| repeat.path.clone(), |last| last.path.clone());
        warn!(file = %file, path = %path, "cyclic reference");
        self.cycles.push(Cycle { file, path });
        cycle_placeholder(&repeat.path)
    }
}

struct RefLocator {
    file: Option<String>,
    query: PathQuery,
}

/// Split a reference like `shared.yaml#/a/b` into its file part and its
/// pointer fragment. A bare fragment stays in the current file; a bare
/// file path addresses that file's root. Remote URLs are rejected.
fn parse_locator(reference: &str) -> Result<RefLocator, DocError> {
    if reference.contains("://") {
        return Err(DocError::ReferenceSyntax(format!(
            "remote reference '{reference}' is not supported"
        )));
    }

    let (location, fragment) = match reference.split_once('#') {
        Some((location, fragment)) => (location, format!("#{fragment}")),
        None => (reference, String::from("#")),
    };
    let query = json_pointer_to_path(&fragment)?;
    let file = (!location.is_empty()).then(|| location.to_string());
    Ok(RefLocator { file, query })
}

fn cycle_placeholder(doc_path: &str) -> Node {
    Node::Mapping(vec![(
        Node::scalar("description"),
        Node::scalar(format!("cyclic reference to {doc_path}")),
    )])
}

fn relative_to(path: &Path, base: &Path) -> String {
    if let Ok(stripped) = path.strip_prefix(base) {
        return stripped.display().to_string();
    }
    let base_components: Vec<_> = base.components().collect();
    let path_components: Vec<_> = path.components().collect();
    let common = base_components
        .iter()
        .zip(&path_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_components.len() {
        out.push("..");
    }
    for component in &path_components[common..] {
        out.push(component);
    }
    out.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::yaml_to_node;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn load(path: &Path) -> Node {
        yaml_to_node(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn resolves_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(
            dir.path(),
            "api.yaml",
            "flow:\n  $ref: 'shared.yaml#/quota'\nwhole:\n  $ref: shared.yaml\n",
        );
        write(dir.path(), "shared.yaml", "quota:\n  limit: 10\n");

        let resolved = resolve_refs(
            &load(&root_file),
            &root_file,
            &ResolveOptions::default(),
        )
        .unwrap();

        assert_eq!(
            resolved.get("flow"),
            Some(&Node::Mapping(vec![(
                Node::scalar("limit"),
                Node::scalar("10")
            )]))
        );
        // a fragment-less reference inlines the whole target document
        assert_eq!(
            resolved.get("whole").and_then(|w| w.get("quota")),
            Some(&Node::Mapping(vec![(
                Node::scalar("limit"),
                Node::scalar("10")
            )]))
        );
    }

    #[test]
    fn resolution_is_idempotent_without_refs() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(dir.path(), "api.yaml", "a:\n  - 1\n  - b: 2\n");
        let node = load(&root_file);
        let resolved = resolve_refs(&node, &root_file, &ResolveOptions::default()).unwrap();
        assert_eq!(resolved, node);
    }

    #[test]
    fn shared_cache_parses_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(
            dir.path(),
            "api.yaml",
            "x:\n  $ref: 'shared.yaml#/a'\ny:\n  $ref: 'shared.yaml#/b'\n",
        );
        write(dir.path(), "shared.yaml", "a: 1\nb: 2\n");

        let mut cache = FileCache::new();
        let resolved = resolve_refs_with_cache(
            &load(&root_file),
            &root_file,
            &ResolveOptions::default(),
            &mut cache,
        )
        .unwrap();

        assert_eq!(resolved.get("x"), Some(&Node::scalar("1")));
        assert_eq!(resolved.get("y"), Some(&Node::scalar("2")));
        assert_eq!(cache.loads(), 1);
    }

    #[test]
    fn relative_paths_resolve_against_the_referencing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("policies")).unwrap();
        let root_file = write(
            dir.path(),
            "api.yaml",
            "p:\n  $ref: 'policies/quota.yaml#/spec'\n",
        );
        // quota.yaml points back up with a path relative to itself
        write(
            &dir.path().join("policies"),
            "quota.yaml",
            "spec:\n  $ref: '../defaults.yaml#/limit'\n",
        );
        write(dir.path(), "defaults.yaml", "limit: 100\n");

        let resolved =
            resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default()).unwrap();
        assert_eq!(resolved.get("p"), Some(&Node::scalar("100")));
    }

    #[test]
    fn two_file_cycle_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(dir.path(), "a.yaml", "$ref: 'b.yaml#/x'\n");
        write(dir.path(), "b.yaml", "x:\n  $ref: 'a.yaml#/'\n");

        let err = resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default())
            .unwrap_err();
        match err {
            DocError::CyclicRefs(cycles) => {
                assert_eq!(cycles.len(), 1);
                assert_eq!(cycles[0].file, "a.yaml");
                assert_eq!(cycles[0].path, "$.x");
            }
            other => panic!("expected CyclicRefs, got {other:?}"),
        }
    }

    #[test]
    fn allowed_cycles_become_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(dir.path(), "a.yaml", "$ref: 'b.yaml#/x'\n");
        write(dir.path(), "b.yaml", "x:\n  $ref: 'a.yaml#/'\n");

        let options = ResolveOptions {
            allow_cycles: true,
            ..ResolveOptions::default()
        };
        let resolved = resolve_refs(&load(&root_file), &root_file, &options).unwrap();
        assert_eq!(
            resolved.get("description").and_then(Node::as_scalar),
            Some("cyclic reference to $")
        );
    }

    #[test]
    fn every_cycle_is_collected_before_failing() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(
            dir.path(),
            "a.yaml",
            "one:\n  $ref: 'b.yaml#/x'\ntwo:\n  $ref: 'b.yaml#/y'\n",
        );
        write(
            dir.path(),
            "b.yaml",
            "x:\n  $ref: 'a.yaml#/one'\ny:\n  $ref: 'a.yaml#/two'\n",
        );

        let err = resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default())
            .unwrap_err();
        match err {
            DocError::CyclicRefs(cycles) => assert_eq!(cycles.len(), 2),
            other => panic!("expected CyclicRefs, got {other:?}"),
        }
    }

    #[test]
    fn root_refs_can_be_left_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(
            dir.path(),
            "api.yaml",
            "a:\n  v: 1\nb:\n  $ref: '#/a'\nc:\n  $ref: 'shared.yaml#/q'\n",
        );
        write(dir.path(), "shared.yaml", "q: ok\n");
        let node = load(&root_file);

        let options = ResolveOptions {
            resolve_root_refs: false,
            ..ResolveOptions::default()
        };
        let resolved = resolve_refs(&node, &root_file, &options).unwrap();
        // the intra-document ref survives, the external one is inlined
        assert_eq!(resolved.get("b"), Some(&Node::new_ref("#/a")));
        assert_eq!(resolved.get("c"), Some(&Node::scalar("ok")));

        let options = ResolveOptions::default();
        let resolved = resolve_refs(&node, &root_file, &options).unwrap();
        assert_eq!(
            resolved.get("b").and_then(|b| b.get("v")),
            Some(&Node::scalar("1"))
        );
    }

    #[test]
    fn remote_references_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(
            dir.path(),
            "api.yaml",
            "r:\n  $ref: 'https://example.com/x.yaml#/a'\n",
        );
        assert!(matches!(
            resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default()),
            Err(DocError::ReferenceSyntax(_))
        ));
    }

    #[test]
    fn missing_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(dir.path(), "api.yaml", "r:\n  $ref: 'shared.yaml#/nope'\n");
        write(dir.path(), "shared.yaml", "a: 1\n");
        assert!(matches!(
            resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default()),
            Err(DocError::ReferenceNotFound { reference }) if reference == "shared.yaml#/nope"
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root_file = write(dir.path(), "api.yaml", "r:\n  $ref: 'absent.yaml#/a'\n");
        assert!(matches!(
            resolve_refs(&load(&root_file), &root_file, &ResolveOptions::default()),
            Err(DocError::FileAccess { .. })
        ));
    }
}
