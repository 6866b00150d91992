//! Serializes a graph into a runnable artifact.

use std::collections::BTreeMap;

use serde::Serialize;

use super::runtime::wrap_table;
use super::text::{escape_json_for_script, quote};
use super::verify::wrap_function;
use crate::config::BundleFormat;
use crate::error::BundleError;
use crate::graph::{AssetId, Graph};

/// One entry of the encoded module table: `[code, mapping]`.
#[derive(Serialize)]
struct EncodedModule<'a>(&'a str, &'a BTreeMap<String, AssetId>);

/// Produces the complete artifact text for `graph`.
///
/// Entries are written in identity order, so the same graph always yields
/// byte-identical output.
pub fn serialize(graph: &Graph, format: BundleFormat) -> Result<String, BundleError> {
    let table = match format {
        BundleFormat::Encoded => encoded_table(graph)?,
        BundleFormat::Inline => inline_table(graph)?,
    };
    Ok(wrap_table(&table))
}

fn encoded_table(graph: &Graph) -> Result<String, BundleError> {
    let table: BTreeMap<AssetId, EncodedModule> = graph
        .iter()
        .map(|asset| (asset.id, EncodedModule(&asset.code, &asset.mapping)))
        .collect();

    let json = serde_json::to_string(&table).map_err(|err| BundleError::Serialization {
        identity: 0,
        reason: err.to_string(),
    })?;
    Ok(escape_json_for_script(&json))
}

fn inline_table(graph: &Graph) -> Result<String, BundleError> {
    let mut table = String::from("{");
    for (index, asset) in graph.iter().enumerate() {
        let function =
            wrap_function(&asset.code).map_err(|reason| BundleError::Serialization {
                identity: asset.id,
                reason,
            })?;
        let mapping = serde_json::to_string(&asset.mapping).map_err(|err| {
            BundleError::Serialization {
                identity: asset.id,
                reason: err.to_string(),
            }
        })?;

        if index > 0 {
            table.push(',');
        }
        table.push_str(&format!(
            "\n{}: [{}, {}]",
            quote(&asset.id.to_string()),
            function,
            escape_json_for_script(&mapping)
        ));
    }
    table.push_str("\n}");
    Ok(table)
}
