use std::path::{Path, PathBuf};

use crate::graph::AssetId;

/// Errors raised while building, serializing, or writing a bundle.
///
/// Every variant is fatal for the current build. Variants carry the path or
/// identity that caused them so the caller can report it unchanged.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to read module `{}`: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to transform module `{}`: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    #[error("circular import detected: {}", display_chain(chain))]
    Cycle { chain: Vec<PathBuf> },

    #[error("module {identity} cannot be serialized: {reason}")]
    Serialization { identity: AssetId, reason: String },

    #[error("failed to write bundle to `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration `{}`: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl BundleError {
    /// The filesystem path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            BundleError::FileRead { path, .. }
            | BundleError::Transform { path, .. }
            | BundleError::Write { path, .. }
            | BundleError::Config { path, .. } => Some(path),
            BundleError::Cycle { chain } => chain.last().map(PathBuf::as_path),
            BundleError::Serialization { .. } => None,
        }
    }
}

/// Diagnostic returned by a [`Transform`](crate::transform::Transform)
/// implementation. The asset builder attaches the offending path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransformError {
    pub message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
