//! Lowers ES module syntax to the `(require, module, exports)` convention.
//!
//! The module is parsed with swc and rewritten in place using the spans of
//! its top-level import/export items; everything else is left verbatim.
//!
//! - Exports become getters on `exports`, defined before any import runs, so
//!   import cycles observe a partially filled exports object rather than a
//!   missing one.
//! - Imports are hoisted ahead of the body, matching ES evaluation order
//!   where dependencies run before the importing module. Named and default
//!   bindings are read once at that point; namespace imports stay live.

use std::path::Path;

use deno_ast::swc::ast::{
    Decl, DefaultDecl, EsVersion, ExportSpecifier, ImportSpecifier, Module, ModuleDecl,
    ModuleExportName, ModuleItem, ObjectPatProp, Pat, Str,
};
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::{BytePos, FileName, SourceMap, Span, Spanned};
use deno_ast::swc::parser::lexer::Lexer;
use deno_ast::swc::parser::{EsSyntax, Parser, StringInput, Syntax};

use super::Transformed;
use crate::bundler::text::quote;
use crate::error::TransformError;

const INTEROP_HELPER: &str = "function __tinypack_interop(m) { return m && m.__esModule ? m : Object.assign({ default: m }, m); }";

const EXPORT_STAR_HELPER: &str = "function __tinypack_export_star(target, source) { Object.keys(source).forEach(function (key) { if (key === \"default\" || key === \"__esModule\" || Object.prototype.hasOwnProperty.call(target, key)) return; Object.defineProperty(target, key, { enumerable: true, get: function () { return source[key]; } }); }); }";

/// Local binding that holds the value of `export default <expr>`.
const DEFAULT_BINDING: &str = "__tinypack_default";

/// Parses `source` as an ES module and lowers it.
///
/// Sources without any import or export syntax are returned unchanged.
pub fn lower_module(path: &Path, source: &str) -> Result<Transformed, TransformError> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file =
        source_map.new_source_file(FileName::Real(path.to_path_buf()).into(), source.to_string());

    let comments = SingleThreadedComments::default();
    let input = StringInput::from(&*source_file);
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::Es2020,
        input,
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| TransformError::new(format!("Parse error: {:?}", e)))?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(TransformError::new(format!("Parse error: {:?}", e)));
    }

    let mut lowering = Lowering::new(source, source_file.start_pos);
    lowering.lower(&module);
    Ok(lowering.finish())
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

struct Lowering<'a> {
    source: &'a str,
    base: BytePos,
    dependencies: Vec<String>,
    edits: Vec<Edit>,
    /// Statements that run before the module body, in source order.
    hoisted: Vec<String>,
    /// `(exported name, expression)` pairs turned into getters.
    getters: Vec<(String, String)>,
    is_module: bool,
    uses_interop: bool,
    uses_export_star: bool,
    temps: usize,
}

impl<'a> Lowering<'a> {
    fn new(source: &'a str, base: BytePos) -> Self {
        Self {
            source,
            base,
            dependencies: Vec::new(),
            edits: Vec::new(),
            hoisted: Vec::new(),
            getters: Vec::new(),
            is_module: false,
            uses_interop: false,
            uses_export_star: false,
            temps: 0,
        }
    }

    fn lower(&mut self, module: &Module) {
        for item in &module.body {
            if let ModuleItem::ModuleDecl(decl) = item {
                self.is_module = true;
                self.lower_decl(decl);
            }
        }
    }

    fn lower_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) => {
                self.remove(import.span);
                if import.type_only {
                    return;
                }

                let specifier = str_value(&import.src);
                self.add_dependency(&specifier);

                if import.specifiers.is_empty() {
                    self.hoisted.push(format!("require({});", quote(&specifier)));
                    return;
                }

                let temp = self.require_temp(&specifier);
                for spec in &import.specifiers {
                    let binding = match spec {
                        ImportSpecifier::Default(default) => {
                            format!("const {} = {}.default;", default.local.sym, temp)
                        }
                        ImportSpecifier::Namespace(namespace) => {
                            format!("const {} = {};", namespace.local.sym, temp)
                        }
                        ImportSpecifier::Named(named) => {
                            if named.is_type_only {
                                continue;
                            }
                            let imported = match &named.imported {
                                Some(name) => self.export_name(name),
                                None => named.local.sym.to_string(),
                            };
                            format!(
                                "const {} = {}[{}];",
                                named.local.sym,
                                temp,
                                quote(&imported)
                            )
                        }
                    };
                    self.hoisted.push(binding);
                }
            }
            ModuleDecl::ExportDecl(export) => {
                self.replace(export.span.lo, export.decl.span().lo, "");
                match &export.decl {
                    Decl::Class(class) => self.export_local(class.ident.sym.to_string()),
                    Decl::Fn(func) => self.export_local(func.ident.sym.to_string()),
                    Decl::Var(var) => {
                        let mut names = Vec::new();
                        for declarator in &var.decls {
                            collect_bindings(&declarator.name, &mut names);
                        }
                        for name in names {
                            self.export_local(name);
                        }
                    }
                    _ => {}
                }
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                let decl_span = export.decl.span();
                let name = match &export.decl {
                    DefaultDecl::Class(class) => class.ident.as_ref().map(|i| i.sym.to_string()),
                    DefaultDecl::Fn(func) => func.ident.as_ref().map(|i| i.sym.to_string()),
                    _ => {
                        self.remove(export.span);
                        return;
                    }
                };
                match name {
                    Some(name) => {
                        self.replace(export.span.lo, decl_span.lo, "");
                        self.getters.push(("default".to_string(), name));
                    }
                    None => {
                        self.replace(
                            export.span.lo,
                            decl_span.lo,
                            &format!("const {} = ", DEFAULT_BINDING),
                        );
                        self.replace(decl_span.hi, decl_span.hi, ";");
                        self.getters
                            .push(("default".to_string(), DEFAULT_BINDING.to_string()));
                    }
                }
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                self.replace(
                    export.span.lo,
                    export.expr.span().lo,
                    &format!("const {} = ", DEFAULT_BINDING),
                );
                self.getters
                    .push(("default".to_string(), DEFAULT_BINDING.to_string()));
            }
            ModuleDecl::ExportNamed(named) => {
                self.remove(named.span);
                if named.type_only {
                    return;
                }

                match &named.src {
                    Some(src) => {
                        let specifier = str_value(src);
                        self.add_dependency(&specifier);
                        let temp = self.require_temp(&specifier);
                        for spec in &named.specifiers {
                            match spec {
                                ExportSpecifier::Named(s) => {
                                    if s.is_type_only {
                                        continue;
                                    }
                                    let orig = self.export_name(&s.orig);
                                    let exported = match &s.exported {
                                        Some(name) => self.export_name(name),
                                        None => orig.clone(),
                                    };
                                    self.getters
                                        .push((exported, format!("{}[{}]", temp, quote(&orig))));
                                }
                                ExportSpecifier::Namespace(s) => {
                                    let exported = self.export_name(&s.name);
                                    self.getters.push((exported, temp.clone()));
                                }
                                ExportSpecifier::Default(s) => {
                                    self.getters.push((
                                        s.exported.sym.to_string(),
                                        format!("{}.default", temp),
                                    ));
                                }
                            }
                        }
                    }
                    None => {
                        for spec in &named.specifiers {
                            if let ExportSpecifier::Named(s) = spec {
                                if s.is_type_only {
                                    continue;
                                }
                                let local = self.export_name(&s.orig);
                                let exported = match &s.exported {
                                    Some(name) => self.export_name(name),
                                    None => local.clone(),
                                };
                                self.getters.push((exported, local));
                            }
                        }
                    }
                }
            }
            ModuleDecl::ExportAll(all) => {
                self.remove(all.span);
                if all.type_only {
                    return;
                }

                let specifier = str_value(&all.src);
                self.add_dependency(&specifier);
                let temp = self.next_temp();
                self.uses_export_star = true;
                self.hoisted.push(format!(
                    "const {temp} = require({}); __tinypack_export_star(exports, {temp});",
                    quote(&specifier)
                ));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Transformed {
        if !self.is_module {
            return Transformed {
                dependencies: Vec::new(),
                code: self.source.to_string(),
            };
        }

        if self.source.starts_with("#!") {
            let end = self.source.find('\n').unwrap_or(self.source.len());
            self.edits.push(Edit {
                start: 0,
                end,
                text: String::new(),
            });
        }

        let mut code = String::with_capacity(self.source.len() + 256);
        code.push_str("\"use strict\";\n");
        code.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
        if self.uses_interop {
            code.push_str(INTEROP_HELPER);
            code.push('\n');
        }
        if self.uses_export_star {
            code.push_str(EXPORT_STAR_HELPER);
            code.push('\n');
        }
        for (name, expr) in &self.getters {
            code.push_str(&format!(
                "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {}; }} }});\n",
                quote(name),
                expr
            ));
        }
        for statement in &self.hoisted {
            code.push_str(statement);
            code.push('\n');
        }

        self.edits.sort_by_key(|edit| (edit.start, edit.end));
        let mut cursor = 0;
        for edit in &self.edits {
            if edit.start < cursor {
                continue;
            }
            code.push_str(&self.source[cursor..edit.start]);
            code.push_str(&edit.text);
            cursor = edit.end;
        }
        code.push_str(&self.source[cursor..]);

        Transformed {
            dependencies: self.dependencies,
            code,
        }
    }

    fn offset(&self, pos: BytePos) -> usize {
        (pos.0 - self.base.0) as usize
    }

    fn replace(&mut self, lo: BytePos, hi: BytePos, text: &str) {
        let start = self.offset(lo);
        let end = self.offset(hi);
        self.edits.push(Edit {
            start,
            end,
            text: text.to_string(),
        });
    }

    fn remove(&mut self, span: Span) {
        self.replace(span.lo, span.hi, "");
    }

    fn add_dependency(&mut self, specifier: &str) {
        if !self.dependencies.iter().any(|d| d == specifier) {
            self.dependencies.push(specifier.to_string());
        }
    }

    fn next_temp(&mut self) -> String {
        let temp = format!("__tinypack_import_{}", self.temps);
        self.temps += 1;
        temp
    }

    /// Hoists `const <temp> = interop(require(specifier))` and returns `<temp>`.
    fn require_temp(&mut self, specifier: &str) -> String {
        let temp = self.next_temp();
        self.uses_interop = true;
        self.hoisted.push(format!(
            "const {} = __tinypack_interop(require({}));",
            temp,
            quote(specifier)
        ));
        temp
    }

    fn export_local(&mut self, name: String) {
        self.getters.push((name.clone(), name));
    }

    fn export_name(&self, name: &ModuleExportName) -> String {
        match name {
            ModuleExportName::Ident(ident) => ident.sym.to_string(),
            ModuleExportName::Str(s) => str_value(s),
        }
    }
}

/// Decoded value of a string literal.
fn str_value(s: &Str) -> String {
    s.value.to_string_lossy().into_owned()
}

/// Collects every identifier bound by a declaration pattern.
fn collect_bindings(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_bindings(elem, out);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => collect_bindings(&kv.value, out),
                    ObjectPatProp::Assign(assign) => out.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => collect_bindings(&rest.arg, out),
                }
            }
        }
        Pat::Rest(rest) => collect_bindings(&rest.arg, out),
        Pat::Assign(assign) => collect_bindings(&assign.left, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(source: &str) -> Transformed {
        lower_module(Path::new("/src/module.js"), source).unwrap()
    }

    #[test]
    fn test_dependencies_in_first_occurrence_order() {
        let out = lower(
            r#"
import { b } from "./b.js";
import a from './a.js';
export { c } from "./c.js";
import "./b.js";
export * from "./d.js";
"#,
        );
        assert_eq!(out.dependencies, vec!["./b.js", "./a.js", "./c.js", "./d.js"]);
    }

    #[test]
    fn test_imports_are_hoisted_requires() {
        let out = lower("console.log(name);\nimport { name as n, other } from './name.js';\n");
        assert_eq!(out.dependencies, vec!["./name.js"]);
        assert!(out
            .code
            .contains("const __tinypack_import_0 = __tinypack_interop(require(\"./name.js\"));"));
        assert!(out.code.contains("const n = __tinypack_import_0[\"name\"];"));
        assert!(out.code.contains("const other = __tinypack_import_0[\"other\"];"));
        assert!(!out.code.contains("import "));

        let hoisted = out.code.find("require(").unwrap();
        let body = out.code.find("console.log(name)").unwrap();
        assert!(hoisted < body);
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let out = lower("import message, * as all from './message.js';\nconsole.log(message);");
        assert!(out.code.contains("const message = __tinypack_import_0.default;"));
        assert!(out.code.contains("const all = __tinypack_import_0;"));
    }

    #[test]
    fn test_side_effect_import() {
        let out = lower("import './polyfill.js';\n");
        assert!(out.code.contains("require(\"./polyfill.js\");"));
        assert!(!out.code.contains("__tinypack_interop(require"));
    }

    #[test]
    fn test_local_exports_become_getters() {
        let out = lower(
            "export const name = 'world', { a, b: [c] } = obj;\nexport function greet() {}\nexport class Greeter {}\nlet x = 1;\nexport { x as y };\n",
        );
        assert!(out.dependencies.is_empty());
        for (exported, local) in [
            ("name", "name"),
            ("a", "a"),
            ("c", "c"),
            ("greet", "greet"),
            ("Greeter", "Greeter"),
            ("y", "x"),
        ] {
            let getter = format!(
                "Object.defineProperty(exports, \"{}\", {{ enumerable: true, get: function () {{ return {}; }} }});",
                exported, local
            );
            assert!(out.code.contains(&getter), "missing getter for {}", exported);
        }
        assert!(out.code.contains("const name = 'world'"));
        assert!(out.code.contains("function greet() {}"));
        assert!(!out.code.contains("export "));
    }

    #[test]
    fn test_default_exports() {
        let expr = lower("export default \"hello \" + name;");
        assert!(expr.code.contains("const __tinypack_default = \"hello \" + name;"));
        assert!(expr.code.contains("return __tinypack_default;"));

        let named = lower("export default function main() { return 1; }");
        assert!(named.code.contains("function main() { return 1; }"));
        assert!(named.code.contains("return main;"));

        let anonymous = lower("export default class {}");
        assert!(anonymous.code.contains("const __tinypack_default = class {};"));
    }

    #[test]
    fn test_reexports() {
        let out = lower("export { a as b, default as c } from './a.js';\nexport * as ns from './ns.js';\nexport * from './all.js';");
        assert_eq!(out.dependencies, vec!["./a.js", "./ns.js", "./all.js"]);
        assert!(out.code.contains("return __tinypack_import_0[\"a\"];"));
        assert!(out.code.contains("return __tinypack_import_0[\"default\"];"));
        assert!(out.code.contains("return __tinypack_import_1;"));
        assert!(out.code.contains(
            "const __tinypack_import_2 = require(\"./all.js\"); __tinypack_export_star(exports, __tinypack_import_2);"
        ));
        assert!(out.code.contains("function __tinypack_export_star("));
    }

    #[test]
    fn test_commonjs_passes_through() {
        let source = "const fs = 1;\nmodule.exports = { fs };\n";
        let out = lower(source);
        assert!(out.dependencies.is_empty());
        assert_eq!(out.code, source);
    }

    #[test]
    fn test_parse_error() {
        let err = lower_module(Path::new("/src/bad.js"), "import { from './x.js';").unwrap_err();
        assert!(err.message.starts_with("Parse error"));
    }

    #[test]
    fn test_escaped_specifiers_are_decoded() {
        assert_eq!(lower(r#"import "./a\x2ejs";"#).dependencies, vec!["./a.js"]);
        assert_eq!(lower(r#"import './it\"s.js';"#).dependencies, vec!["./it\"s.js"]);
        assert_eq!(lower(r#"import "./\u{61}.js";"#).dependencies, vec!["./a.js"]);
        assert_eq!(lower(r"import './it\'s.js';").dependencies, vec!["./it's.js"]);
    }

    #[test]
    fn test_string_export_names_are_decoded() {
        let out = lower(r#"export { "a\x2db" as c } from './a.js';"#);
        assert!(out.code.contains("return __tinypack_import_0[\"a-b\"];"));
    }
}
