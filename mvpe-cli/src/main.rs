//! mvpe - Schema compiler CLI for MVP.Express
//!
//! Parses `.mvpe.yaml` interface definitions, assigns stable numeric ids
//! against the lockfile, and emits Rust stubs.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use mvpe_codegen::LockMode;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mvpe")]
#[command(about = "Schema compiler and stable-id manager for MVP.Express")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Ignore the lockfile entirely (throwaway generation)
    Off,
    /// Validate against the lockfile without writing (CI)
    Check,
    /// Allocate missing ids and persist the lockfile (local development)
    Write,
}

impl From<Mode> for LockMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Off => LockMode::Off,
            Mode::Check => LockMode::Check,
            Mode::Write => LockMode::Write,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate Rust stubs from a schema
    Generate {
        /// Path to the .mvpe.yaml (or .json) schema
        schema: PathBuf,

        /// Output directory for generated code
        #[arg(short, long)]
        out: PathBuf,

        /// Module nesting for the emitted file (e.g. bank::v1)
        #[arg(short, long)]
        module: Option<String>,

        /// Lockfile participation mode
        #[arg(long, value_enum, default_value = "write")]
        mode: Mode,

        /// Lockfile path (defaults to .mvpe.ids.lock next to the schema)
        #[arg(long)]
        lockfile: Option<PathBuf>,
    },

    /// Verify the schema against the lockfile without writing anything
    Check {
        /// Path to the schema
        schema: PathBuf,

        /// Lockfile path (defaults to .mvpe.ids.lock next to the schema)
        #[arg(long)]
        lockfile: Option<PathBuf>,
    },

    /// Validate a schema file without touching ids or emitting code
    Validate {
        /// Path to the schema
        schema: PathBuf,
    },

    /// Print a summary of a schema
    Info {
        /// Path to the schema
        schema: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            schema,
            out,
            module,
            mode,
            lockfile,
        } => commands::generate(schema, out, module, mode.into(), lockfile),
        Commands::Check { schema, lockfile } => commands::check(schema, lockfile),
        Commands::Validate { schema } => commands::validate(schema),
        Commands::Info { schema } => commands::info(schema),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_error(&err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
