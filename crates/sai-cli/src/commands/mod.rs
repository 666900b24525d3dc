//! CLI command implementations — one file per subcommand family (spec
//! §6). Every software/service/monitoring subcommand funnels through the shared
//! [`run_single_action`] helper, which drives
//! `ActionOrchestrator::execute_action` (spec §4.9 steps 1-10) exactly
//! once and renders the result. `apply`, `list`, `stats` and `saidata`
//! are not single-action invocations and keep their own drivers.

pub mod apply;
pub mod list;
pub mod monitor;
pub mod saidata;
pub mod service;
pub mod software;
pub mod stats;

use std::time::Duration;

use sai_orchestrator::{AutoConfirm, Confirmer, ExecuteRequest};

use crate::app::App;
use crate::confirm::ConsolePrompt;
use crate::output;

/// Flags shared by every single-action subcommand, lifted out of `Cli` so
/// family handlers don't each need the whole parsed command line.
pub struct GlobalOpts {
    pub provider: Option<String>,
    pub yes: bool,
    pub dry_run: bool,
    pub json: bool,
}

pub async fn run_single_action(
    app: &App,
    action: &str,
    software: &str,
    variables: Vec<(String, String)>,
    global: &GlobalOpts,
) -> i32 {
    let mut req = ExecuteRequest::new(action, software);
    req.provider = global.provider.clone();
    req.variables = variables.into_iter().collect();
    req.yes = global.yes;
    req.dry_run = global.dry_run;
    req.timeout = Some(Duration::from_secs(app.config.timeout));

    let confirmer: Box<dyn Confirmer> = if global.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(ConsolePrompt::new(app.config.clone()))
    };

    let result = app.orchestrator.execute_action(req, confirmer.as_ref()).await;
    let exit_code = result.exit_code;
    output::emit_result(
        &result,
        global.json,
        app.config.output.show_commands,
        app.config.output.show_exit_codes,
    );
    exit_code
}
