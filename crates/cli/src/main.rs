//! mdreg - Managed domain registry administration
//!
//! Adds, lists, updates and removes managed domains in a catalog directory.
//! Results go to stdout, logs to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use mdreg_config::{validate, Config};
use mdreg_store::{Catalog, Workflow};

mod commands;
mod output;

use commands::{CaSettings, Dispatcher, MdCommand, Surface};
use output::Response;

/// mdreg - Registry of managed domains for certificate management
#[derive(Parser, Debug)]
#[command(name = "mdreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", env = "MDREG_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog directory
    #[arg(short = 'd', long = "store-dir")]
    store_dir: Option<PathBuf>,

    /// CA url for added managed domains, or a CA update
    #[arg(short = 'a', long = "ca-url")]
    ca_url: Option<String>,

    /// CA protocol for added managed domains, or a CA update
    #[arg(short = 'p', long = "ca-proto")]
    ca_proto: Option<String>,

    /// Print results as JSON
    #[arg(short = 'j', long = "json")]
    json: bool,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Administrative operations, lifecycle state is left alone
    Store {
        #[command(subcommand)]
        command: MdCommand,
    },
    #[command(flatten)]
    Workflow(MdCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return finish(Response::error(&e), cli.json),
    };
    let json = config.json;

    let response = match run(cli, &config) {
        Ok(response) => response,
        Err(e) => {
            debug!(error = ?e, "Command failed");
            Response::error(&e)
        }
    };
    finish(response, json)
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, config file, environment, then command line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let validation = validate::validate_config(&config);
    if !validation.is_valid() {
        let errors: Vec<String> = validation.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration: {}", errors.join("; "));
    }

    let config = apply_flags(config, cli);
    for warning in &validate::lint::lint_config(&config).warnings {
        warn!("{}", warning);
    }

    debug!(
        store_dir = %config.store_dir.display(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Layer command line flags over the loaded configuration
///
/// `-a`/`-p` become the CA defaults for added managed domains. Their
/// syntax is checked by the catalog like any other CA input.
fn apply_flags(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref store_dir) = cli.store_dir {
        config.store_dir = store_dir.clone();
    }
    if cli.json {
        config.json = true;
    }
    if let Some(ref url) = cli.ca_url {
        config.ca.url = Some(url.clone());
    }
    if let Some(ref proto) = cli.ca_proto {
        config.ca.proto = Some(proto.clone());
    }
    config
}

fn run(cli: Cli, config: &Config) -> Result<Response> {
    let catalog = Catalog::open(&config.store_dir)
        .with_context(|| format!("Failed to open catalog at {:?}", config.store_dir))?
        .with_lock_timeout(config.lock_timeout());
    let dispatcher = Dispatcher::new(Workflow::new(catalog));

    let flag_ca = CaSettings {
        url: cli.ca_url,
        proto: cli.ca_proto,
    };
    let add_ca = CaSettings {
        url: config.ca.url.clone(),
        proto: config.ca.proto.clone(),
    };

    let (surface, command) = match cli.command {
        Commands::Store { command } => (Surface::Store, command),
        Commands::Workflow(command) => (Surface::Workflow, command),
    };
    dispatcher.run(surface, command, &add_ca, &flag_ca)
}

fn finish(response: Response, json: bool) -> ExitCode {
    let status = response.status;

    if json {
        match response.to_json() {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("mdreg: failed to render response: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else if status == 0 {
        print!("{}", response.to_text());
    } else {
        eprint!("{}", response.to_text());
    }

    let _ = std::io::stdout().flush();
    ExitCode::from(status)
}
