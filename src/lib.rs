use std::io::{BufRead, Write};

use thiserror::Error;

pub mod console;
pub mod logging;
pub mod machine;
pub mod parser;
pub mod randomizer;
pub mod runtime;

#[cfg(test)]
mod c_rsc;

pub use console::{print_number, read_number, Console, ConsoleError};
pub use machine::{execute, Host, Machine, MachineError};
pub use parser::{parse, Diagnostic, DiagnosticKind, Diagnostics, Instruction, Op, Program};
pub use randomizer::{round_cents, Draw, Randomizer};
pub use runtime::Runtime;

#[derive(Debug, Clone)]
pub struct Options {
    /// Fixed generator seed. `None` seeds from the clock.
    pub seed: Option<u64>,
    /// Give up reading a number after this many invalid entries.
    pub max_input_attempts: Option<usize>,
    /// Abort a program after this many executed instructions.
    pub max_steps: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seed: None,
            max_input_attempts: None,
            max_steps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RscError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] Diagnostics),
    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// Parse `source` and run it against the given console streams.
pub fn run_source<R: BufRead, W: Write>(
    source: &str,
    reader: R,
    writer: W,
    options: &Options,
) -> Result<(R, W), RscError> {
    let program = parse(source)?;
    let runtime = Runtime::new(reader, writer, options);
    Ok(execute(&program, runtime, options)?.into_inner())
}
