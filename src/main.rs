//! Flowsync CLI Entry Point
//!
//! Registers a declarative workflow definition against the remote platform.
//!
//! # Usage
//!
//! ```bash
//! # Register a workflow on the test network
//! flowsync workflow.json --endpoint https://registry.example.net
//!
//! # Preview the decision without applying it
//! flowsync workflow.json --dry-run
//!
//! # Register on the production network
//! flowsync workflow.json --network mainnet --endpoint https://registry.example.net
//!
//! # Use a custom state directory and workflow name
//! flowsync workflow.json --name ingest --state-dir /var/lib/flowsync
//! ```

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use flowsync::client::http::HttpRegistrationClient;
use flowsync::sync::{preview, DryRunOutcome, Network, StateStore, SyncOutcome, Synchronizer};
use flowsync::workflow::parser::load_raw;
use flowsync::{APP_NAME, VERSION};

/// Environment variable consulted when --endpoint is not given.
const ENDPOINT_ENV: &str = "FLOWSYNC_ENDPOINT";

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    definition_path: Option<PathBuf>,
    name: Option<String>,
    network: Network,
    endpoint: Option<String>,
    state_dir: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definition_path: None,
            name: None,
            network: Network::Testnet,
            endpoint: None,
            state_dir: None,
            dry_run: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Declarative Workflow Registration Synchronizer");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: flowsync [OPTIONS] <DEFINITION_FILE>");
    println!();
    println!("Arguments:");
    println!("  <DEFINITION_FILE>   Path to the workflow definition JSON file");
    println!();
    println!("Options:");
    println!("  --network NET       Target network: testnet or mainnet (default: testnet)");
    println!("  --dry-run           Report the sync decision without applying it");
    println!("  --endpoint URL      Registration endpoint (or {} env var)", ENDPOINT_ENV);
    println!("  --name NAME         Workflow name (default: definition file stem)");
    println!("  --state-dir PATH    Registration state directory (default: .flowsync)");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  flowsync workflow.json --dry-run");
    println!("  flowsync workflow.json --network mainnet --endpoint https://registry.example.net");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => {
                config.dry_run = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--network" => {
                i += 1;
                if i >= args.len() {
                    return Err("--network requires a value (testnet or mainnet)".to_string());
                }
                config.network = args[i].parse()?;
            }
            "--endpoint" => {
                i += 1;
                if i >= args.len() {
                    return Err("--endpoint requires a URL argument".to_string());
                }
                config.endpoint = Some(args[i].clone());
            }
            "--name" => {
                i += 1;
                if i >= args.len() {
                    return Err("--name requires a value".to_string());
                }
                config.name = Some(args[i].clone());
            }
            "--state-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--state-dir requires a path argument".to_string());
                }
                config.state_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.definition_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.definition_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Derives the workflow name from the definition file when --name is absent.
fn workflow_name(config: &Config, path: &Path) -> String {
    config.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("workflow")
            .to_string()
    })
}

/// Prints an applied outcome.
fn report_outcome(outcome: &SyncOutcome) {
    println!();
    match outcome {
        SyncOutcome::Created { state } => {
            println!(
                "{} workflow registered (remote id {}, collection {})",
                "Created:".green().bold(),
                state.remote_workflow_id,
                state.remote_collection_id
            );
        }
        SyncOutcome::Updated { changes, state } => {
            println!(
                "{} workflow {} now at version {}",
                "Updated:".yellow().bold(),
                state.remote_workflow_id,
                state.registered_version
            );
            for change in changes {
                println!("  {}", change);
            }
        }
        SyncOutcome::Unchanged { state } => {
            println!(
                "Unchanged: version {} already registered (remote id {})",
                state.registered_version, state.remote_workflow_id
            );
        }
    }
}

/// Prints a dry-run outcome.
fn report_preview(outcome: &DryRunOutcome) {
    println!();
    match outcome {
        DryRunOutcome::WouldCreate => {
            println!("{} no prior registration found", "Would create:".green().bold());
        }
        DryRunOutcome::WouldUpdate { changes } => {
            println!(
                "{} {} field(s) differ",
                "Would update:".yellow().bold(),
                changes.len()
            );
            for change in changes {
                println!("  {}", change);
            }
        }
        DryRunOutcome::Unchanged => {
            println!("Unchanged: registration already matches the definition");
        }
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    let Some(ref definition_path) = config.definition_path else {
        print_usage();
        return Err("missing <DEFINITION_FILE> argument".into());
    };

    let name = workflow_name(&config, definition_path);
    let environment: HashMap<String, String> = env::vars().collect();
    let store = match &config.state_dir {
        Some(dir) => StateStore::new(dir),
        None => StateStore::default_location(),
    };

    info!("Workflow: {} on {}", name, config.network);
    if config.dry_run {
        info!("Mode: DRY RUN (no remote calls, no state writes)");
    }

    let raw = load_raw(definition_path).map_err(|e| {
        error!("Failed to load definition: {}", e);
        e
    })?;

    if config.dry_run {
        let outcome = preview(&store, &name, config.network, &raw, &environment)?;
        report_preview(&outcome);
        return Ok(());
    }

    let endpoint = config
        .endpoint
        .clone()
        .or_else(|| env::var(ENDPOINT_ENV).ok())
        .ok_or_else(|| {
            format!(
                "no registration endpoint configured; pass --endpoint or set {}",
                ENDPOINT_ENV
            )
        })?;

    let synchronizer = Synchronizer::new(HttpRegistrationClient::new(endpoint), store);
    let outcome = synchronizer.register(&name, config.network, &raw, &environment)?;
    report_outcome(&outcome);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
