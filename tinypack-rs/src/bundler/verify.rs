//! Checks that module code can be pasted verbatim into a function body.
//!
//! Inline bundles splice each module's code between `function (require,
//! module, exports) {` and `}`. Code that closes that function early and
//! reopens another one would still parse, but would run outside its scope,
//! so acceptance requires the wrapper to parse as exactly one function
//! expression ending where the wrapper ends.

use deno_ast::swc::ast::{EsVersion, Expr, Stmt};
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::{FileName, SourceMap};
use deno_ast::swc::parser::lexer::Lexer;
use deno_ast::swc::parser::{EsSyntax, Parser, StringInput, Syntax};

/// Header placed before module code in inline bundles.
pub const FUNCTION_HEADER: &str = "function (require, module, exports) {\n";

/// Footer placed after module code in inline bundles.
pub const FUNCTION_FOOTER: &str = "\n}";

/// Returns the inline function text for `code`, or the reason it cannot be
/// embedded.
pub fn wrap_function(code: &str) -> Result<String, String> {
    let function = format!("{FUNCTION_HEADER}{code}{FUNCTION_FOOTER}");
    check_single_function(&function)?;
    Ok(function)
}

fn check_single_function(function: &str) -> Result<(), String> {
    let wrapped = format!("({function});");

    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        FileName::Custom("tinypack:inline".to_string()).into(),
        wrapped.clone(),
    );
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::Es2020,
        StringInput::from(&*source_file),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let script = parser
        .parse_script()
        .map_err(|e| format!("code does not parse inside a function body: {:?}", e))?;
    if let Some(e) = parser.take_errors().into_iter().next() {
        return Err(format!(
            "code does not parse inside a function body: {:?}",
            e
        ));
    }

    let [Stmt::Expr(statement)] = script.body.as_slice() else {
        return Err("code escapes the module function".to_string());
    };
    let Expr::Paren(paren) = &*statement.expr else {
        return Err("code escapes the module function".to_string());
    };
    let Expr::Fn(fn_expr) = &*paren.expr else {
        return Err("code escapes the module function".to_string());
    };

    // The function must close at the footer's brace, just before `);`.
    let end = (fn_expr.function.span.hi.0 - source_file.start_pos.0) as usize;
    if end != wrapped.len() - 2 {
        return Err("code escapes the module function".to_string());
    }
    Ok(())
}
