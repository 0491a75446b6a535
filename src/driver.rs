//! Driver: argument marshaling and result printing
//!
//! Seeds the run with `main` arguments parsed against the declared
//! parameter kinds, invokes `main`, and prints the results one per line in
//! declaration order. Integers print as decimal; floats print in fixed
//! notation with six fractional digits. A trap produces exactly the line
//! `!trap` on the output stream and nothing else; everything before the
//! instance exists (missing `main`, argc mismatch, unparseable argument)
//! is an environmental error for the caller to report on stderr.

use crate::module::{ExportKind, Module};
use crate::runtime::{Instance, Value};
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// The line printed to stdout when execution traps
pub const TRAP_LINE: &str = "!trap";

/// Environmental errors: the run never started, nothing was printed
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("module does not export a main function")]
    MissingMain,
    #[error("main takes {expected} arguments, but {given} were provided")]
    ArgumentCount { expected: usize, given: usize },
    #[error("argument {index}: {message}")]
    InvalidArgument { index: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Instantiate the module and run its exported `main` with the given
/// textual arguments, writing the outcome to `out`.
pub fn run(module: &Module, args: &[String], out: &mut impl Write) -> Result<(), DriverError> {
    let export = module
        .find_export("main", ExportKind::Function)
        .ok_or(DriverError::MissingMain)?;
    let sig = module.signature(export.index).ok_or(DriverError::MissingMain)?;

    if args.len() != sig.params.len() {
        return Err(DriverError::ArgumentCount {
            expected: sig.params.len(),
            given: args.len(),
        });
    }
    let mut values = Vec::with_capacity(args.len());
    for (index, (param_type, text)) in sig.params.iter().zip(args).enumerate() {
        let value = Value::from_text(*param_type, text)
            .map_err(|message| DriverError::InvalidArgument { index, message })?;
        values.push(value);
    }

    let main_idx = export.index;
    let outcome = Instance::new(module).and_then(|mut instance| instance.invoke_index(main_idx, values));

    match outcome {
        Ok(results) => {
            for value in &results {
                print_result(out, value)?;
            }
        }
        Err(trap) => {
            debug!(%trap, "execution trapped");
            writeln!(out, "{TRAP_LINE}")?;
        }
    }
    Ok(())
}

fn print_result(out: &mut impl Write, value: &Value) -> std::io::Result<()> {
    match value {
        Value::I32(v) => writeln!(out, "{v}"),
        Value::I64(v) => writeln!(out, "{v}"),
        // Fixed notation is required; `{:.6}` never switches to scientific
        Value::F32(v) => writeln!(out, "{v:.6}"),
        Value::F64(v) => writeln!(out, "{v:.6}"),
    }
}
