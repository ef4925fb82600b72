//! CLI tools for ciplan
//!
//! - `plan`: Dry-run the build matrix and print every job's tasks
//! - `check`: Validate a descriptor
//! - `branch`: Test a branch name against the descriptor's branch rule
//! - `completions`: Generate shell completions

pub mod branch;
pub mod check;
pub mod completions;
pub mod plan;

use anyhow::{Context, Result};
use ciplan::config::{LoadedConfig, StepRegistry, load_descriptor, load_file};
use ciplan::infrastructure::{Settings, init_logging};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// CLI arguments for ciplan
#[derive(Parser, Debug)]
#[command(name = "ciplan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults apply when absent)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Log level; enables logging to stderr
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Where to find the descriptor
#[derive(clap::Args, Debug, Clone)]
pub struct DescriptorArgs {
    /// Directory searched for a descriptor
    #[arg(short = 'C', long, default_value = ".")]
    pub dir: PathBuf,
    /// Descriptor file; its name selects the dialect
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the jobs the build matrix expands to
    Plan {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
        /// Matrix filters: KEY==VALUE, KEY=VALUE or KEY!=VALUE
        filters: Vec<String>,
    },

    /// Validate a descriptor
    Check {
        #[command(flatten)]
        descriptor: DescriptorArgs,
    },

    /// Exit 0 if the branch may be built, 1 otherwise
    Branch {
        /// Branch name
        name: String,
        #[command(flatten)]
        descriptor: DescriptorArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Loads the descriptor named by `args`
///
/// # Errors
///
/// Missing descriptor, unreadable file or invalid content.
pub fn load(args: &DescriptorArgs, settings: &Settings) -> Result<LoadedConfig> {
    let registry = Arc::new(StepRegistry::with_builtins());
    match &args.file {
        Some(file) => load_file(file, registry)
            .with_context(|| format!("Failed to load descriptor: {}", file.display())),
        None => load_descriptor(&args.dir, settings, registry)
            .with_context(|| format!("Failed to load descriptor from: {}", args.dir.display())),
    }
}

/// Parse and execute CLI arguments
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(level) = &args.log_level {
        init_logging(level);
    } else if std::env::var("CIPLAN_DEBUG").is_ok() {
        init_logging(&settings.log_level);
    }

    match args.command {
        Command::Plan {
            descriptor,
            json,
            filters,
        } => {
            let output = plan::plan_jobs(&descriptor, &filters, json, &settings)?;
            println!("{output}");
        }
        Command::Check { descriptor } => {
            let report = check::check_descriptor(&descriptor, &settings)?;
            println!("{report}");
        }
        Command::Branch { name, descriptor } => {
            if !branch::can_build(&descriptor, &name, &settings)? {
                println!("branch '{name}' is not built");
                return Ok(ExitCode::FAILURE);
            }
            println!("branch '{name}' is built");
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
