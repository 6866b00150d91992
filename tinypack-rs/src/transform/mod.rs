//! Source transformation.
//!
//! A [`Transform`] turns one file's text into the list of specifiers it
//! imports and a code string that runs inside
//! `function (require, module, exports) { ... }`.

mod esm;

use std::path::Path;

use crate::bundler::text::json_module_source;
use crate::error::TransformError;

pub use esm::lower_module;

/// Output of a transform: dependencies in order of first occurrence and the
/// lowered module body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transformed {
    pub dependencies: Vec<String>,
    pub code: String,
}

/// Compiles a single source file.
///
/// Implementations must only rely on `require`, `module`, and `exports` as
/// module-system bindings in the code they return.
pub trait Transform {
    fn transform(&self, path: &Path, source: &str) -> Result<Transformed, TransformError>;
}

/// Default transform: JSON files become value modules, everything else is
/// parsed as an ES module and lowered to the `require` calling convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleTransformer;

impl Transform for ModuleTransformer {
    fn transform(&self, path: &Path, source: &str) -> Result<Transformed, TransformError> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str::<serde_json::Value>(source)
                .map_err(|err| TransformError::new(format!("invalid JSON: {}", err)))?;
            return Ok(Transformed {
                dependencies: Vec::new(),
                code: json_module_source(source),
            });
        }

        lower_module(path, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_module() {
        let out = ModuleTransformer
            .transform(Path::new("/data/config.json"), r#"{"port": 8080}"#)
            .unwrap();
        assert!(out.dependencies.is_empty());
        assert!(out.code.starts_with("module.exports = JSON.parse("));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = ModuleTransformer
            .transform(Path::new("/data/config.json"), "{port: }")
            .unwrap_err();
        assert!(err.message.starts_with("invalid JSON"));
    }
}
