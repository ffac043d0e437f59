mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::FlagOverrides;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("geomkit CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let app_config = config::build_config(
        cli.config.as_deref(),
        &cli.set_values,
        &flag_overrides(&cli.command),
    )?;
    debug!(?app_config, "Configuration resolved");

    let progress = if cli.quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };

    let command_result = match cli.command {
        Commands::Cartesian(args) => {
            info!("Dispatching to 'cartesian' command.");
            commands::cartesian::run(args, &app_config, &progress)
        }
        Commands::Zmatrix(args) => {
            info!("Dispatching to 'zmatrix' command.");
            commands::zmatrix::run(args, &app_config, &progress)
        }
        Commands::Bonds(args) => {
            info!("Dispatching to 'bonds' command.");
            commands::bonds::run(args, &app_config, &progress)
        }
        Commands::Graft(args) => {
            info!("Dispatching to 'graft' command.");
            commands::graft::run(args, &app_config, &progress)
        }
        Commands::Reconcile(args) => {
            info!("Dispatching to 'reconcile' command.");
            commands::reconcile::run(args, &app_config, &progress)
        }
        Commands::Fragments(_) => {
            info!("Dispatching to 'fragments' command.");
            commands::fragments::run(&app_config)
        }
    };

    match &command_result {
        Ok(()) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}

/// Collects the configuration values a subcommand's flags set explicitly.
fn flag_overrides(command: &Commands) -> FlagOverrides {
    let mut flags = FlagOverrides::default();
    match command {
        Commands::Zmatrix(args) => {
            flags.angle_threshold = args.angle_threshold;
            flags.create_variables = args.create_variables.then_some(true);
        }
        Commands::Bonds(args) => {
            flags.bonding_scale = args.bonding_scale;
            flags.bonding_tolerance = args.bonding_tolerance;
        }
        Commands::Graft(args) => {
            flags.fragment_library = args.fragments.clone();
            flags.bond_length_table = args.bond_lengths.clone();
        }
        Commands::Reconcile(args) => {
            flags.allow_constant_update = args.allow_constant_update.then_some(true);
            flags.align_to_input = args.no_align.then_some(false);
        }
        Commands::Fragments(args) => {
            flags.fragment_library = args.fragments.clone();
        }
        Commands::Cartesian(_) => {}
    }
    flags
}
