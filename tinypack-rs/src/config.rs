use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BundleError;
use crate::graph::GraphOptions;

/// How module code is stored in the artifact's module table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    /// Code travels as JSON string literals and is compiled by the loader on
    /// first use. Any code string survives embedding.
    #[default]
    Encoded,
    /// Code is pasted into function expressions. Each module is checked to
    /// parse as exactly one function before it is accepted.
    Inline,
}

impl FromStr for BundleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "encoded" => Ok(BundleFormat::Encoded),
            "inline" => Ok(BundleFormat::Inline),
            _ => Err(format!(
                "Invalid bundle format: {}. Expected one of: encoded, inline",
                s
            )),
        }
    }
}

/// Options for a single bundle build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleOptions {
    pub format: BundleFormat,
    /// See [`GraphOptions::dedupe`].
    pub dedupe: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            format: BundleFormat::default(),
            dedupe: true,
        }
    }
}

impl BundleOptions {
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            dedupe: self.dedupe,
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("bundle.js")
}

/// Contents of a `tinypack.json` project file.
///
/// ```json
/// { "entry": "src/main.js", "output": "dist/app.js", "format": "inline" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub entry: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(flatten)]
    pub options: BundleOptions,
}

impl ProjectConfig {
    /// Reads a project file. Relative `entry` and `output` paths are taken
    /// relative to the directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        let text = fs::read_to_string(path).map_err(|err| BundleError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config: ProjectConfig =
            serde_json::from_str(&text).map_err(|err| BundleError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.entry = base.join(&config.entry);
        config.output = base.join(&config.output);
        Ok(config)
    }
}
