//! LxConsole CLI - Main Entry Point

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use lxconsole_cli::commands::{self, instance, network, options, permission, profile, Context};
use lxconsole_cli::config::CliConfig;
use lxconsole_cli::output::{self, print_item, print_success, OutputFormat};

/// LxConsole CLI - Profile Inheritance Inspector
#[derive(Parser)]
#[command(name = "lxconsole")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Inventory snapshot (JSON or YAML)
    #[arg(short, long, env = "LXCONSOLE_INVENTORY", global = true)]
    inventory: Option<PathBuf>,

    /// Configuration file
    #[arg(long, env = "LXCONSOLE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect instances and their inherited values
    #[command(subcommand)]
    Instance(instance::InstanceCommands),

    /// Inspect profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Inspect network attachments
    #[command(subcommand)]
    Network(network::NetworkCommands),

    /// Inspect permissions and their select options
    #[command(subcommand)]
    Permission(permission::PermissionCommands),

    /// Inspect documented configuration options
    #[command(subcommand)]
    Options(options::OptionsCommands),

    /// Manage the CLI configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(lxconsole_common::default_config_path);
    debug!(path = %config_path.display(), "Loading configuration");
    let config = CliConfig::load(&config_path)?;

    let format = cli.format.unwrap_or(config.format);
    let ctx = Context {
        inventory_path: config.inventory_path(cli.inventory.as_deref()),
        config,
        format,
    };

    match cli.command {
        Commands::Instance(cmd) => instance::execute(cmd, &ctx)?,
        Commands::Profile(cmd) => profile::execute(cmd, &ctx)?,
        Commands::Network(cmd) => network::execute(cmd, &ctx)?,
        Commands::Permission(cmd) => permission::execute(cmd, &ctx)?,
        Commands::Options(cmd) => options::execute(cmd, &ctx)?,
        Commands::Config(ConfigCommands::Show) => {
            output::print_value(&ctx.config, format);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!("{} already exists; pass --force to overwrite", config_path.display());
            }
            CliConfig::default().save(&config_path)?;
            print_success(&format!("Wrote {}", config_path.display()));
        }
        Commands::Version => {
            print_item(&commands::VersionDisplay::current(), format);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
