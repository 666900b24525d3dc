//! `saidata {status|update|sync|init|clean}` (spec §6 "Batch & meta").
//! The remote repository fetch/clone is explicitly out of scope for this
//! core (spec §1 "Out of scope"): `update`/`sync` here only invalidate
//! the in-memory cache so a subsequent resolve re-reads whatever is on
//! disk, and do not themselves reach the network.

use crate::app::{self, App};
use crate::cli::SaidataCommand;
use crate::ui::Ui;

pub fn handle(app: &App, command: SaidataCommand) -> i32 {
    let root = app::saidata_root(&app.config);
    match command {
        SaidataCommand::Status => {
            Ui::info(&format!("saidata root: {}", root.display()));
            Ui::info(&format!("exists: {}", root.is_dir()));
            if !app.config.repository.git_url.is_empty() {
                Ui::info(&format!("upstream: {}", app.config.repository.git_url));
            }
            if app.config.repository.offline_mode {
                Ui::info("offline mode: sync is disabled");
            }
            0
        }
        SaidataCommand::Update | SaidataCommand::Sync => {
            if app.config.repository.offline_mode {
                Ui::warning("offline mode is set; not attempting a repository sync");
                return 1;
            }
            app.orchestrator.saidata().invalidate_all();
            Ui::warning(
                "remote saidata repository sync is an external collaborator (spec §1); \
                 only the local cache was refreshed",
            );
            0
        }
        SaidataCommand::Init => match std::fs::create_dir_all(&root) {
            Ok(()) => {
                Ui::success(&format!("created {}", root.display()));
                0
            }
            Err(e) => {
                Ui::error(&format!("cannot create {}: {e}", root.display()));
                1
            }
        },
        SaidataCommand::Clean => {
            app.orchestrator.saidata().invalidate_all();
            Ui::success("cleared in-memory saidata cache");
            0
        }
    }
}
