//! Bundle construction.
//!
//! A bundle is produced in three steps:
//! 1. Discover the module graph from the entry file (`crate::graph`)
//! 2. Serialize every asset into a module table (`emit`)
//! 3. Prefix the table with the loader that executes it (`runtime`)
//!
//! # Architecture
//!
//! - `emit`: Module table serialization for both bundle formats
//! - `runtime`: The JavaScript loader embedded in every artifact
//! - `verify`: Wrapper check for the inline format
//! - `text`: Utility functions for text processing

mod emit;
pub mod runtime;
pub mod text;
mod verify;

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

pub use emit::serialize;

use crate::config::BundleOptions;
use crate::error::BundleError;
use crate::graph::build_graph;
use crate::transform::{ModuleTransformer, Transform};

/// A finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEmit {
    /// Artifact text; executing it runs the entry module.
    pub code: String,
    /// Number of assets in the module table.
    pub modules: usize,
}

/// Bundles `entry`, resolved against `base_dir`, with the default transform.
pub fn bundle(
    entry: &Path,
    base_dir: &Path,
    options: &BundleOptions,
) -> Result<BundleEmit, BundleError> {
    bundle_with(entry, base_dir, options, &ModuleTransformer)
}

/// Bundles `entry`, resolved against `base_dir`, compiling every file with
/// `transform`.
pub fn bundle_with(
    entry: &Path,
    base_dir: &Path,
    options: &BundleOptions,
    transform: &dyn Transform,
) -> Result<BundleEmit, BundleError> {
    let entry_path = base_dir.join(entry);
    let graph = build_graph(&entry_path, transform, &options.graph_options())?;
    let code = serialize(&graph, options.format)?;

    info!(
        "bundled {} module(s) from {} ({} bytes, {:?} format)",
        graph.len(),
        entry_path.display(),
        code.len(),
        options.format
    );

    Ok(BundleEmit {
        code,
        modules: graph.len(),
    })
}

/// Writes `emit` to `path`, creating missing parent directories.
pub fn write_bundle(path: &Path, emit: &BundleEmit) -> Result<(), BundleError> {
    let write_error = |source| BundleError::Write {
        path: PathBuf::from(path),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, &emit.code).map_err(write_error)?;

    info!("wrote bundle to {}", path.display());
    Ok(())
}
