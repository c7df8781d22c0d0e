//! File loading with a parse-once cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::DocError;
use crate::node::Node;
use crate::yaml::yaml_to_node;

/// Parsed document cache keyed by absolute file path.
///
/// Each file is read and parsed at most once per cache lifetime; the
/// resolver shares one cache across a whole resolution pass. `loads`
/// counts actual parse operations so tests can assert reuse.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<PathBuf, Node>,
    loads: usize,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed root node of `path`, reading the file only on first access.
    pub fn load(&mut self, path: &Path) -> Result<&Node, DocError> {
        let abs = absolutize(path)?;
        match self.entries.entry(abs) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                debug!(file = %slot.key().display(), "parsing referenced file");
                let text = fs::read_to_string(slot.key()).map_err(|source| DocError::FileAccess {
                    path: slot.key().clone(),
                    source,
                })?;
                let node = yaml_to_node(&text).map_err(|source| DocError::FileParse {
                    path: slot.key().clone(),
                    source: Box::new(source),
                })?;
                self.loads += 1;
                Ok(slot.insert(node))
            }
        }
    }

    /// Number of files actually read and parsed so far.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

/// Lexically absolute form of a path: joined against the process working
/// directory when relative, with `.` and `..` components folded away. No
/// filesystem access, so unlike `fs::canonicalize` it also works for paths
/// that are about to fail with a proper "could not load" error.
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf, DocError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        fs::write(&path, "a: 1\n").unwrap();

        let mut cache = FileCache::new();
        let first = cache.load(&path).unwrap().clone();
        assert_eq!(first.get("a"), Some(&Node::scalar("1")));

        // same file through a dotted path still hits the cache
        let dotted = dir.path().join(".").join("doc.yaml");
        cache.load(&dotted).unwrap();
        cache.load(&path).unwrap();
        assert_eq!(cache.loads(), 1);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let mut cache = FileCache::new();
        assert!(matches!(
            cache.load(&path),
            Err(DocError::FileAccess { path: reported, .. }) if reported == absolutize(&path).unwrap()
        ));
    }

    #[test]
    fn unparsable_file_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "a: [unclosed\n").unwrap();
        let mut cache = FileCache::new();
        assert!(matches!(
            cache.load(&path),
            Err(DocError::FileParse { .. })
        ));
    }

    #[test]
    fn absolutize_folds_dot_components() {
        let base = Path::new("/tmp/project/specs");
        let folded = absolutize(&base.join("../shared/./common.yaml")).unwrap();
        assert_eq!(folded, PathBuf::from("/tmp/project/shared/common.yaml"));
    }
}
