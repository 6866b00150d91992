//! Executes artifacts in an embedded V8 isolate.
//!
//! The host installs a `console` whose output is collected instead of
//! printed, so callers can observe what a bundle did.

use deno_core::{op2, JsRuntime, OpState, RuntimeOptions};
use deno_error::JsErrorBox;
use log::debug;
use regex::Regex;

use crate::graph::AssetId;

/// Errors raised by an artifact while it runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("module {identity} has no mapping for specifier \"{specifier}\"")]
    UnresolvedSpecifier { identity: AssetId, specifier: String },

    #[error("no module with identity {identity}")]
    UnknownIdentity { identity: String },

    #[error("uncaught exception: {message}")]
    Script { message: String },
}

lazy_static! {
    static ref UNRESOLVED_SPECIFIER_RE: Regex =
        Regex::new(r#"UnresolvedSpecifierError: module (\d+) has no mapping for specifier ("(?:[^"\\]|\\.)*")"#)
            .expect("valid regex");
    static ref UNKNOWN_IDENTITY_RE: Regex =
        Regex::new(r"UnknownIdentityError: no module with identity (\S+)").expect("valid regex");
}

impl HostError {
    fn classify(message: String) -> Self {
        if let Some(caps) = UNRESOLVED_SPECIFIER_RE.captures(&message) {
            // The loader writes the specifier as a JSON string literal
            let specifier = serde_json::from_str::<String>(&caps[2]);
            if let (Ok(identity), Ok(specifier)) = (caps[1].parse::<AssetId>(), specifier) {
                return HostError::UnresolvedSpecifier {
                    identity,
                    specifier,
                };
            }
        }
        if let Some(caps) = UNKNOWN_IDENTITY_RE.captures(&message) {
            return HostError::UnknownIdentity {
                identity: caps[1].to_string(),
            };
        }
        HostError::Script { message }
    }
}

/// Console lines written by the running artifact.
#[derive(Debug, Default)]
struct HostOutput {
    lines: Vec<String>,
}

#[op2(fast)]
fn op_tinypack_print(state: &mut OpState, #[string] line: String) -> Result<(), JsErrorBox> {
    let output = state
        .try_borrow_mut::<HostOutput>()
        .ok_or_else(|| JsErrorBox::generic("console output is not available"))?;
    output.lines.push(line);
    Ok(())
}

deno_core::extension!(
    tinypack_host,
    ops = [op_tinypack_print],
    esm_entry_point = "ext:tinypack_host/bootstrap.js",
    esm = [
        "ext:tinypack_host/bootstrap.js" = {
            source = r#"
                import { op_tinypack_print } from "ext:core/ops";

                function format(value) {
                    if (typeof value === "string") return value;
                    if (value !== null && typeof value === "object") {
                        try {
                            return JSON.stringify(value);
                        } catch {
                            return String(value);
                        }
                    }
                    return String(value);
                }

                function print(...args) {
                    op_tinypack_print(args.map(format).join(" "));
                }

                globalThis.console = {
                    log: print,
                    info: print,
                    warn: print,
                    error: print,
                    debug: print,
                };
            "#
        }
    ],
);

/// A V8 isolate ready to run artifacts.
///
/// Globals persist between [`Host::execute`] calls on the same host; use a
/// fresh host for isolated runs.
pub struct Host {
    runtime: JsRuntime,
}

impl Host {
    pub fn new() -> Self {
        let runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![tinypack_host::init()],
            ..Default::default()
        });
        runtime.op_state().borrow_mut().put(HostOutput::default());
        Self { runtime }
    }

    /// Runs `artifact` and returns the console lines it produced.
    pub fn execute(&mut self, artifact: &str) -> Result<Vec<String>, HostError> {
        let result = self
            .runtime
            .execute_script("tinypack:bundle.js", artifact.to_string());

        let op_state = self.runtime.op_state();
        let lines = op_state
            .borrow_mut()
            .try_borrow_mut::<HostOutput>()
            .map(|output| std::mem::take(&mut output.lines))
            .unwrap_or_default();

        match result {
            Ok(_) => {
                debug!("artifact finished with {} console line(s)", lines.len());
                Ok(lines)
            }
            Err(err) => Err(HostError::classify(err.to_string())),
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `artifact` in a new [`Host`].
pub fn run_artifact(artifact: &str) -> Result<Vec<String>, HostError> {
    Host::new().execute(artifact)
}
