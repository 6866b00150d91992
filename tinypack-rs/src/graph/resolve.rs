//! Specifier resolution for import statements.
//!
//! Specifiers are joined onto the importing module's directory the same way
//! `path.join` does, then probed for a handful of implicit extensions.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Extensions tried, in order, when a specifier names no existing file.
const PROBE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

/// Resolves `specifier` relative to `dir`.
///
/// Returns the first existing candidate. When nothing exists the joined path
/// is returned unchanged so that reading it reports the path the user wrote.
pub fn resolve_specifier(dir: &Path, specifier: &str) -> PathBuf {
    let joined = normalize(&dir.join(specifier));
    if joined.is_file() {
        return joined;
    }

    for ext in PROBE_EXTENSIONS {
        let candidate = with_appended_extension(&joined, ext);
        if candidate.is_file() {
            return candidate;
        }
    }

    let index = joined.join("index.js");
    if index.is_file() {
        return index;
    }

    joined
}

/// Lexically collapses `.` and `..` segments.
///
/// `..` at the root stays at the root, matching `path.join("/", "..")`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Key used to recognise the same file reached through different specifiers.
pub fn canonical_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}
