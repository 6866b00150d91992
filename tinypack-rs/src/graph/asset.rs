use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bundler::text::strip_bom;
use crate::error::BundleError;
use crate::transform::Transform;

/// Identity of an asset within one graph. The entry is always `0`.
pub type AssetId = usize;

/// One compiled source file.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub id: AssetId,
    /// Resolved location on disk. Never written into the artifact.
    pub path: PathBuf,
    /// Raw specifiers in order of first occurrence.
    pub dependencies: Vec<String>,
    /// Specifier to the identity of the asset it resolved to.
    pub mapping: BTreeMap<String, AssetId>,
    #[serde(skip)]
    pub code: String,
}

impl Asset {
    /// Directory that relative specifiers of this asset are resolved against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// True once every specifier has a mapping entry.
    pub fn is_resolved(&self) -> bool {
        self.mapping.len() == self.dependencies.len()
            && self
                .dependencies
                .iter()
                .all(|specifier| self.mapping.contains_key(specifier))
    }
}

/// Turns files into identified assets.
///
/// Owns the identity counter for a single build. The counter starts at zero
/// and only moves forward; a new build needs a new builder.
pub struct AssetBuilder<'a> {
    transform: &'a dyn Transform,
    next_id: AssetId,
}

impl<'a> AssetBuilder<'a> {
    pub fn new(transform: &'a dyn Transform) -> Self {
        Self {
            transform,
            next_id: 0,
        }
    }

    /// Reads, transforms, and identifies the file at `path`.
    ///
    /// The identity is only consumed when both steps succeed.
    pub fn build(&mut self, path: &Path) -> Result<Asset, BundleError> {
        let source = fs::read_to_string(path).map_err(|source| BundleError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let transformed = self
            .transform
            .transform(path, strip_bom(&source))
            .map_err(|err| BundleError::Transform {
                path: path.to_path_buf(),
                message: err.message,
            })?;

        let id = self.next_id;
        self.next_id += 1;

        Ok(Asset {
            id,
            path: path.to_path_buf(),
            dependencies: transformed.dependencies,
            mapping: BTreeMap::new(),
            code: transformed.code,
        })
    }

    /// Number of identities handed out so far.
    pub fn issued(&self) -> usize {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::transform::{ModuleTransformer, Transformed};

    struct Rejecting;

    impl Transform for Rejecting {
        fn transform(&self, _path: &Path, _source: &str) -> Result<Transformed, TransformError> {
            Err(TransformError::new("unexpected token"))
        }
    }

    #[test]
    fn test_identities_increase() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "import './b.js';").unwrap();
        fs::write(&b, "export const b = 1;").unwrap();

        let transform = ModuleTransformer;
        let mut builder = AssetBuilder::new(&transform);
        let first = builder.build(&a).unwrap();
        let second = builder.build(&b).unwrap();

        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(first.dependencies, vec!["./b.js".to_string()]);
        assert!(first.mapping.is_empty());
        assert_eq!(builder.issued(), 2);
    }

    #[test]
    fn test_missing_file_is_file_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.js");

        let transform = ModuleTransformer;
        let mut builder = AssetBuilder::new(&transform);
        match builder.build(&missing) {
            Err(BundleError::FileRead { path, .. }) => assert_eq!(path, missing),
            other => panic!("Expected FileRead, got {:?}", other),
        }
        assert_eq!(builder.issued(), 0);
    }

    #[test]
    fn test_transform_failure_carries_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.js");
        fs::write(&file, "let = ;").unwrap();

        let mut builder = AssetBuilder::new(&Rejecting);
        match builder.build(&file) {
            Err(BundleError::Transform { path, message }) => {
                assert_eq!(path, file);
                assert_eq!(message, "unexpected token");
            }
            other => panic!("Expected Transform, got {:?}", other),
        }
    }
}
