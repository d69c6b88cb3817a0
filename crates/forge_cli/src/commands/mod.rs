//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod generate;
pub mod validate;

/// appforge - prompt-to-application generation pipeline
#[derive(Parser)]
#[command(name = "appforge")]
#[command(version, about = "appforge - prompt-to-application generation pipeline")]
#[command(long_about = r#"
appforge turns a free-text prompt into a small application through a fixed
pipeline of generation agents (planner, backend, frontend, tester,
deployment), validates the generated code, and reports the results.

WORKFLOWS:
  generate   → Submit a prompt, follow the live log stream, write the files
  validate   → Validate an existing directory of generated files

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an application from a prompt
    Generate(generate::GenerateArgs),

    /// Validate generated files in a directory
    Validate(validate::ValidateArgs),
}
