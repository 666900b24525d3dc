//! Software management: `install`, `uninstall`, `upgrade`, `search`,
//! `info`, `version` (spec §6 "Software management"). `install` and
//! `upgrade` create the resources they reference, so `SafetyEvaluator`
//! skips resource-existence checks for them (spec §4.6 check 1); `search`,
//! `info` and `version` are information-only and, with more than one
//! available provider, run across every candidate instead of prompting
//! (spec §4.9 step 5). `uninstall` is destructive, and the only action
//! where removing software in the critical-software set escalates to a
//! hard safety error rather than a warning (spec §4.6 check 3).

use crate::app::App;
use crate::cli::Commands;

use super::{run_single_action, GlobalOpts};

pub async fn handle(app: &App, command: &Commands, global: &GlobalOpts) -> i32 {
    let action = command.action_name().expect("software subcommand has an action name");
    let software = command.software().expect("software subcommand names a software id");
    run_single_action(app, action, &software, command.variables(), global).await
}
