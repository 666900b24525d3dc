//! sai — universal software-management command-line tool (SPEC_FULL §6
//! [AMBIENT]). The thinnest possible adapter over `sai-orchestrator`'s
//! public API: parse arguments, load configuration, wire the provider
//! registry and saidata store, dispatch one subcommand, render the
//! result.

pub mod app;
pub mod cli;
pub mod commands;
pub mod confirm;
pub mod output;
pub mod tracing_setup;
pub mod ui;

use clap::Parser;

use cli::{Cli, Commands};
use commands::GlobalOpts;
use ui::Ui;

/// Parses arguments, runs one subcommand to completion, and returns the
/// process exit code (spec §6 "Exit codes").
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let config = match sai_config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            output::emit_error(&e, cli.json);
            return e.exit_code();
        }
    };

    tracing_setup::init(cli.verbose, cli.quiet, &config.log_level);
    Ui::set_quiet(cli.quiet);

    let app = app::App::bootstrap(config);
    let global = GlobalOpts {
        provider: cli.provider.clone(),
        yes: cli.yes,
        dry_run: cli.dry_run,
        json: cli.json,
    };

    match &cli.command {
        Commands::Install { .. }
        | Commands::Uninstall { .. }
        | Commands::Upgrade { .. }
        | Commands::Search { .. }
        | Commands::Info { .. }
        | Commands::Version { .. } => commands::software::handle(&app, &cli.command, &global).await,

        Commands::Start { .. }
        | Commands::Stop { .. }
        | Commands::Restart { .. }
        | Commands::Enable { .. }
        | Commands::Disable { .. }
        | Commands::Status { .. } => commands::service::handle(&app, &cli.command, &global).await,

        Commands::Logs { .. }
        | Commands::Cpu { .. }
        | Commands::Memory { .. }
        | Commands::Io { .. }
        | Commands::Check { .. }
        | Commands::Config { .. } => commands::monitor::handle(&app, &cli.command, &global).await,

        Commands::Apply { file, variables } => {
            commands::apply::handle(&app, file, variables.vars.clone(), cli.yes, cli.json).await
        }
        Commands::List => commands::list::handle(&app, cli.json),
        Commands::Stats => commands::stats::handle(&app, cli.json).await,
        Commands::Saidata { command } => commands::saidata::handle(&app, command.clone()),
    }
}
