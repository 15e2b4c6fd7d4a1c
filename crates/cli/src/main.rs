mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use modkit_lib::consts::PROJECT_FILE;
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// modkit - install Lua modules into a project build context
#[derive(Parser)]
#[command(name = "modkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a project file and install its modules
  Install {
    /// Path to the project file
    #[arg(default_value = PROJECT_FILE)]
    config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show how a specifier resolves against a project
  Resolve {
    /// Module specifier to resolve
    specifier: String,

    /// Path to the project file
    #[arg(short, long, default_value = PROJECT_FILE)]
    config: PathBuf,
  },
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Install { config, output } => cmd::cmd_install(&config, output),
    Commands::Resolve { specifier, config } => cmd::cmd_resolve(&specifier, &config),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
