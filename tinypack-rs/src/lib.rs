// Allow uninlined format args for cleaner error construction
#![allow(clippy::uninlined_format_args)]
#![doc = include_str!("../README.md")]

pub mod bundler;
pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod transform;

#[macro_use]
extern crate lazy_static;

// extern crate deno_core makes it available at crate root for op2 and extension! macros
extern crate deno_core;

pub use bundler::{bundle, bundle_with, serialize, write_bundle, BundleEmit};
pub use config::{BundleFormat, BundleOptions, ProjectConfig};
pub use error::{BundleError, TransformError};
pub use graph::{build_graph, Asset, AssetId, Graph, GraphOptions};
pub use host::{run_artifact, Host, HostError};
pub use transform::{ModuleTransformer, Transform, Transformed};
pub use serde_json;
