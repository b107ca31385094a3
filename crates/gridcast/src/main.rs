// gridcast entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (stderr, so stdout carries only JSON)
// 3. Build the scoring rules once
// 4. Load config (except for `score`, which needs none)
// 5. Run the subcommand and print its JSON result

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use gridcast_core::config::{self, Config};
use gridcast_core::scoring::ScoringRules;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;
    debug!("gridcast starting: {:?}", cli.command);

    let rules = ScoringRules::standard();

    let output = match &cli.command {
        Commands::Project(args) => commands::project(&load_config(&cli)?, args, &rules)?,
        Commands::Lineup(args) => commands::lineup(&load_config(&cli)?, args)?,
        Commands::Waivers(args) => commands::waivers(&load_config(&cli)?, args)?,
        Commands::Streamers(args) => commands::streamers(&load_config(&cli)?, args)?,
        Commands::Score(args) => commands::score(args, &rules)?,
    };

    let text = serde_json::to_string_pretty(&output).context("failed to render output")?;
    println!("{text}");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, {} starting slots",
        config.league.name,
        config.league.num_teams,
        config.league.starting_slots().len()
    );
    Ok(config)
}

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "gridcast=debug,gridcast_core=debug,warn"
    } else {
        "gridcast=info,gridcast_core=info,warn"
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
