//! Dependency graph discovery.
//!
//! Starting from the entry file, modules are discovered breadth-first. Each
//! discovered file becomes an [`Asset`] whose identity is its discovery index,
//! and every asset records which identity each of its specifiers resolved to.

mod asset;
pub mod resolve;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

pub use asset::{Asset, AssetBuilder, AssetId};

use crate::error::BundleError;
use crate::transform::Transform;
use resolve::{canonical_key, normalize, resolve_specifier};

/// Options controlling graph discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    /// Give every file a single identity no matter how many import paths
    /// reach it. When disabled each import site compiles the file again
    /// under a fresh identity and import cycles are rejected.
    pub dedupe: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self { dedupe: true }
    }
}

/// All assets reachable from the entry, in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    assets: Vec<Asset>,
}

impl Graph {
    /// The entry asset (identity 0).
    pub fn entry(&self) -> &Asset {
        &self.assets[0]
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }
}

/// Builds the graph rooted at `entry`.
///
/// `entry` should be absolute; it is normalized but not canonicalized so the
/// entry asset keeps the path the caller supplied.
pub fn build_graph(
    entry: &Path,
    transform: &dyn Transform,
    options: &GraphOptions,
) -> Result<Graph, BundleError> {
    let mut builder = AssetBuilder::new(transform);
    let mut seen: HashMap<PathBuf, AssetId> = HashMap::new();
    // Import chain leading to each asset, indexed by identity. Only consulted
    // without dedupe, where a repeated path on the chain would never end.
    let mut chains: Vec<Vec<PathBuf>> = Vec::new();

    let entry_path = normalize(entry);
    let entry_asset = builder.build(&entry_path)?;
    debug!("entry asset 0: {}", entry_path.display());

    let entry_key = canonical_key(&entry_path);
    seen.insert(entry_key.clone(), entry_asset.id);
    chains.push(vec![entry_key]);

    let mut assets = vec![entry_asset];
    let mut queue: VecDeque<AssetId> = VecDeque::from([0]);

    while let Some(current) = queue.pop_front() {
        let dir = assets[current].dir().to_path_buf();
        let dependencies = assets[current].dependencies.clone();

        for specifier in dependencies {
            let child_path = resolve_specifier(&dir, &specifier);
            let child_key = canonical_key(&child_path);

            let reused = if options.dedupe {
                seen.get(&child_key).copied()
            } else {
                None
            };

            let child_id = match reused {
                Some(id) => {
                    debug!("asset {current}: `{specifier}` reuses asset {id}");
                    id
                }
                None => {
                    let mut chain = chains[current].clone();
                    if !options.dedupe && chain.contains(&child_key) {
                        chain.push(child_key);
                        return Err(BundleError::Cycle { chain });
                    }

                    let child = builder.build(&child_path)?;
                    debug!(
                        "asset {current}: `{specifier}` -> asset {} ({})",
                        child.id,
                        child_path.display()
                    );

                    let id = child.id;
                    seen.entry(child_key.clone()).or_insert(id);
                    chain.push(child_key);
                    chains.push(chain);
                    assets.push(child);
                    queue.push_back(id);
                    id
                }
            };

            assets[current].mapping.insert(specifier, child_id);
        }
    }

    debug_assert!(assets.iter().enumerate().all(|(i, a)| a.id == i));
    debug_assert_eq!(builder.issued(), assets.len());

    Ok(Graph { assets })
}
