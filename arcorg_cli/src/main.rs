use anyhow::{Context, Result};
use arcorg_cli::config::{AppConfig, ConfigManager};
use arcorg_cli::error::CliError;
use arcorg_cli::manifest::Manifest;
use arcorg_cli::orchestrators::{OfflineDirectory, ReconcileOrchestrator, RunReport};
use arcorg_cli::output::{OutputFormat, OutputFormatter, create_formatter};
use arcorg_cli::paths;
use arcorg_cli::state::FileStateStore;
use arcorg_cli::terminal;
use arcorg_core::{AccountReconciler, DirectoryService, OrganizationsDirectory};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "arcorg")]
#[command(author, version, about = "Reversible account lifecycle for cloud organizations", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Manifest declaring the managed accounts
    #[arg(short, long, global = true, default_value = paths::DEFAULT_MANIFEST_FILE)]
    manifest: PathBuf,

    /// State file holding the managed records
    #[arg(short, long, global = true, default_value = paths::DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// Output format (defaults to output.default_format)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would do, without calling the directory
    Plan,

    /// Create, adopt or quarantine accounts to match the manifest
    Apply,

    /// Re-read every managed account from the directory
    Refresh,

    /// Quarantine one managed account
    Destroy {
        /// Resource key from the state file
        key: String,
    },

    /// Bring an existing account under management
    Import {
        /// Resource key declared in the manifest
        key: String,

        /// External id of the account (arcorg:<account-id>)
        external_id: String,
    },

    /// Print the managed records
    Show,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., reconcile.parallelism)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., reconcile.parallelism)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("arcorg_core", log::LevelFilter::Debug)
            .filter_module("arcorg_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let debug = cli.debug;
    if let Err(e) = run(cli).await {
        let error = CliError::from(e);
        eprint!("{}", error.format_for_user(debug));
        std::process::exit(error.exit_code() as i32);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Config { command } => return config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            return Ok(());
        }
        _ => {}
    }

    let config = ConfigManager::new()
        .load()
        .context("Failed to load configuration")?;

    let use_color = config.output.color_enabled && terminal::supports_color();
    colored::control::set_override(use_color);

    let format = match cli.format {
        Some(format) => format,
        None => OutputFormat::from_string(&config.output.default_format)?,
    };
    let formatter = create_formatter(format, use_color);
    let store = Arc::new(FileStateStore::new(cli.state.clone()));

    match cli.command {
        Commands::Plan => {
            let manifest = Manifest::load(&cli.manifest)?;
            let orchestrator = orchestrator(&config, Arc::new(OfflineDirectory), store);
            let plan = orchestrator.plan(&manifest).await?;
            print!("{}", formatter.format_plan(&plan)?);
        }
        Commands::Show => {
            let orchestrator = orchestrator(&config, Arc::new(OfflineDirectory), store);
            let state = orchestrator.show().await?;
            print!("{}", formatter.format_state(&state)?);
        }
        Commands::Apply => {
            let manifest = Manifest::load(&cli.manifest)?;
            let orchestrator = orchestrator(&config, online(&config).await, store);
            let report = orchestrator.apply(&manifest).await?;
            finish("apply", report, formatter.as_ref())?;
        }
        Commands::Refresh => {
            let orchestrator = orchestrator(&config, online(&config).await, store);
            let report = orchestrator.refresh().await?;
            finish("refresh", report, formatter.as_ref())?;
        }
        Commands::Destroy { key } => {
            let orchestrator = orchestrator(&config, online(&config).await, store);
            let report = orchestrator.destroy(&key).await?;
            finish("destroy", report, formatter.as_ref())?;
        }
        Commands::Import { key, external_id } => {
            let manifest = Manifest::load(&cli.manifest)?;
            let orchestrator = orchestrator(&config, online(&config).await, store);
            let report = orchestrator.import(&manifest, &key, &external_id).await?;
            finish("import", report, formatter.as_ref())?;
        }
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn online(config: &AppConfig) -> Arc<dyn DirectoryService> {
    Arc::new(OrganizationsDirectory::from_config(&config.directory).await)
}

fn orchestrator(
    config: &AppConfig,
    directory: Arc<dyn DirectoryService>,
    store: Arc<FileStateStore>,
) -> ReconcileOrchestrator {
    let reconciler = AccountReconciler::with_config(directory, config.reconcile.reconciler.clone());
    ReconcileOrchestrator::new(reconciler, store, config.reconcile.parallelism)
}

/// Print a report and fail with its first error, if any
fn finish(command: &str, report: RunReport, formatter: &dyn OutputFormatter) -> Result<()> {
    print!("{}", formatter.format_report(command, &report)?);

    match report.into_error() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager
                .get(&key)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            // Group items by section
            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let section = key.split('.').next().unwrap_or("general").to_string();
                sections.entry(section).or_default().push((key, value));
            }

            for (section, items) in sections {
                println!("[{section}]");
                for (key, value) in items {
                    let display_key = key.split_once('.').map_or(key.as_str(), |(_, rest)| rest);
                    println!("  {} = {}", display_key.cyan(), value);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
