//! Monitoring: `logs`, `cpu`, `memory`, `io`, `check`, `config` (spec §6
//! "Monitoring"). All but `check` are information-only and fan out across
//! every available provider when more than one candidate exists (spec
//! §4.9 step 5, glossary "Information-only action"); `check` also runs
//! the full `SafetyEvaluator` pass since it is meant to surface exactly
//! the warnings/errors a system-changing action would hit.

use crate::app::App;
use crate::cli::Commands;

use super::{run_single_action, GlobalOpts};

pub async fn handle(app: &App, command: &Commands, global: &GlobalOpts) -> i32 {
    let action = command.action_name().expect("monitoring subcommand has an action name");
    let software = command.software().expect("monitoring subcommand names a software id");
    run_single_action(app, action, &software, command.variables(), global).await
}
