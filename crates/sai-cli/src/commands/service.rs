//! Service management: `start`, `stop`, `restart`, `enable`, `disable`,
//! `status` (spec §6 "Service management"). `stop` and `disable` are
//! destructive actions (spec §4.6 check 3, §4.9 step 7): they require a
//! stricter confirmation and are refused outright on a safety error for
//! software in the critical-software set.

use crate::app::App;
use crate::cli::Commands;

use super::{run_single_action, GlobalOpts};

pub async fn handle(app: &App, command: &Commands, global: &GlobalOpts) -> i32 {
    let action = command.action_name().expect("service subcommand has an action name");
    let software = command.software().expect("service subcommand names a software id");
    run_single_action(app, action, &software, command.variables(), global).await
}
