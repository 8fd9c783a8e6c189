use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rsc::logging::init_logging;
use rsc::{execute, parse, Options, Program, RscError, Runtime};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "rsc",
    version,
    about = "Runs programs for the RSC (Reasonably Simple Computer)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = "warn", help = "Log level, overridden by RUST_LOG")]
    log_level: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run an RSC program", arg_required_else_help = true)]
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, help = "Fixed seed for the random generator")]
        seed: Option<u64>,

        #[arg(long, value_name = "N", help = "Stop after N executed instructions")]
        max_steps: Option<u64>,

        #[arg(long, value_name = "N", help = "Give up input after N invalid entries")]
        max_attempts: Option<usize>,
    },

    #[command(about = "Check an RSC program for errors", arg_required_else_help = true)]
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(long, short, value_name = "FILE", help = "The file containing the program")]
    file: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Run {
            source,
            seed,
            max_steps,
            max_attempts,
        } => {
            let options = Options {
                seed,
                max_input_attempts: max_attempts,
                max_steps,
            };
            run(&source.file, &options)
        }
        Commands::Check { source } => check(&source.file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "failed");
            ExitCode::from(1)
        }
    }
}

fn load(file: &str) -> Result<(String, Program), RscError> {
    let source = fs::read_to_string(file).map_err(|source| RscError::Read {
        path: file.to_string(),
        source,
    })?;
    match parse(&source) {
        Ok(program) => Ok((source, program)),
        Err(diagnostics) => {
            eprintln!("{}", diagnostics.annotate(&source));
            Err(diagnostics.into())
        }
    }
}

fn check(file: &str) -> Result<(), RscError> {
    let (_, program) = load(file)?;
    info!(file, instructions = program.len(), "program is valid");
    Ok(())
}

fn run(file: &str, options: &Options) -> Result<(), RscError> {
    let (_, program) = load(file)?;
    info!(file, instructions = program.len(), "running program");
    execute(&program, Runtime::stdio(options), options)?;
    Ok(())
}
