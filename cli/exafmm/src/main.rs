//! ExaFMM CLI: configure builds and inspect toolchains.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgMatches, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use exafmm_configure::CommandLine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::configure::ConfigureArgs;
use manifest::ExafmmManifest;

#[derive(Parser)]
#[command(name = "exafmm", version, about = "ExaFMM build configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect compilers and write the build description for an arch
    Configure(ConfigureArgs),
    /// Check toolchain and project status
    Doctor,
    /// Inspect and check toolchain descriptions
    Toolchain {
        #[command(subcommand)]
        action: ToolchainAction,
    },
}

#[derive(Subcommand)]
enum ToolchainAction {
    /// Print the detected toolchain (or one loaded from a file)
    Describe {
        /// Load from a .toolchain.toml instead of probing
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output format (toml, json)
        #[arg(long)]
        format: Option<String>,
    },
    /// Print a starting .toolchain.toml
    Template {
        /// Toolchain name
        name: String,
    },
    /// Validate a .toolchain.toml
    Validate {
        /// Toolchain file
        file: PathBuf,
    },
}

fn main() {
    init_tracing();

    let command = Cli::command();
    let matches = command.clone().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let command_line = configure_command_line(&command, &matches);

    if let Err(e) = run(cli, command_line) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `EXAFMM_LOG` sets the filter; `EXAFMM_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let log_format = std::env::var("EXAFMM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_env("EXAFMM_LOG")
        .unwrap_or_else(|_| "exafmm=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// The explicit `configure` arguments, or an empty record for other commands.
fn configure_command_line(command: &Command, matches: &ArgMatches) -> CommandLine {
    match (
        command.find_subcommand("configure"),
        matches.subcommand_matches("configure"),
    ) {
        (Some(sub), Some(sub_matches)) => commands::configure::explicit_arguments(sub, sub_matches),
        _ => CommandLine::new(),
    }
}

fn run(cli: Cli, command_line: CommandLine) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Configure(args) => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::configure::run(&project_dir, manifest.as_ref(), &args, command_line)?;
            Ok(())
        }

        Commands::Doctor => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::doctor::run(&project_dir)
        }

        Commands::Toolchain { action } => match action {
            ToolchainAction::Describe { file, format } => {
                let text = commands::toolchain::describe(file.as_deref(), format.as_deref())?;
                print!("{text}");
                if !text.ends_with('\n') {
                    println!();
                }
                Ok(())
            }
            ToolchainAction::Template { name } => {
                print!("{}", commands::toolchain::template(&name)?);
                Ok(())
            }
            ToolchainAction::Validate { file } => commands::toolchain::validate(&file),
        },
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<ExafmmManifest>, Option<PathBuf>)> {
    match ExafmmManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
