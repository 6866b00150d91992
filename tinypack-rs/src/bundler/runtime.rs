//! The loader embedded at the top of every artifact.
//!
//! The loader receives the module table, starts at identity `0`, and gives
//! each module a `require` that looks specifiers up in that module's own
//! mapping. Exports are never cached: every `require` of an identity runs its
//! function again with fresh `module`/`exports` objects. The only exception
//! is a module that is still executing, which yields its partially filled
//! `module.exports` so import cycles terminate.

/// Opening half of the loader. The module table follows it directly.
pub const LOADER_PRELUDE: &str = r#"(function (modules) {
  var hasOwn = Object.prototype.hasOwnProperty;
  var executing = {};
  var compiled = {};

  function fail(name, message) {
    var error = new Error(message);
    error.name = name;
    throw error;
  }

  function load(id) {
    var fn = modules[id][0];
    if (typeof fn !== "string") {
      return fn;
    }
    if (!hasOwn.call(compiled, id)) {
      compiled[id] = new Function("require", "module", "exports", fn);
    }
    return compiled[id];
  }

  function require(id) {
    if (!hasOwn.call(modules, id)) {
      fail("UnknownIdentityError", "no module with identity " + id);
    }
    if (hasOwn.call(executing, id)) {
      return executing[id].exports;
    }

    var mapping = modules[id][1];
    function localRequire(specifier) {
      if (!hasOwn.call(mapping, specifier)) {
        fail(
          "UnresolvedSpecifierError",
          "module " + id + " has no mapping for specifier " + JSON.stringify(String(specifier))
        );
      }
      return require(mapping[specifier]);
    }

    var module = { exports: {} };
    executing[id] = module;
    try {
      load(id)(localRequire, module, module.exports);
    } finally {
      delete executing[id];
    }
    return module.exports;
  }

  require(0);
})("#;

/// Closing half of the loader.
pub const LOADER_EPILOGUE: &str = ");\n";

/// Wraps a module table literal with the loader.
///
/// The table is an object literal keyed by identity whose values are
/// `[fn, mapping]` pairs, where `fn` is either a function taking
/// `(require, module, exports)` or the source text of its body.
pub fn wrap_table(table: &str) -> String {
    let mut artifact =
        String::with_capacity(LOADER_PRELUDE.len() + table.len() + LOADER_EPILOGUE.len());
    artifact.push_str(LOADER_PRELUDE);
    artifact.push_str(table);
    artifact.push_str(LOADER_EPILOGUE);
    artifact
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_table_starts_at_entry() {
        let artifact = wrap_table("{}");
        assert!(artifact.starts_with("(function (modules) {"));
        assert!(artifact.ends_with("})({});\n"));
        assert!(artifact.contains("require(0);"));
    }

    #[test]
    fn test_loader_has_no_export_cache() {
        assert!(!LOADER_PRELUDE.contains("cache"));
        assert!(LOADER_PRELUDE.contains("var module = { exports: {} };"));
    }
}
