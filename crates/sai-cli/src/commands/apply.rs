//! `apply <file>` (spec §6 "Batch & meta", §4 SUPPLEMENT): drives a
//! declarative action sequence through `run_apply_file`, rendering each
//! step's result as it completes and honoring the file's `on_failure`
//! policy already implemented by `sai_orchestrator::apply`.

use std::collections::HashMap;
use std::path::Path;

use sai_orchestrator::{run_apply_file, AutoConfirm, Confirmer};

use crate::app::App;
use crate::confirm::ConsolePrompt;
use crate::output;
use crate::ui::Ui;

pub async fn handle(
    app: &App,
    file: &Path,
    variables: Vec<(String, String)>,
    yes: bool,
    json: bool,
) -> i32 {
    let contents = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            Ui::error(&format!("cannot read apply file '{}': {e}", file.display()));
            return 1;
        }
    };

    let overrides: HashMap<String, String> = variables.into_iter().collect();
    let confirmer: Box<dyn Confirmer> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(ConsolePrompt::new(app.config.clone()))
    };

    match run_apply_file(&app.orchestrator, &contents, &overrides, yes, confirmer.as_ref()).await {
        Ok(outcome) => {
            for (name, result) in &outcome.results {
                if !json {
                    Ui::info(&format!("--- {name} ---"));
                }
                output::emit_result(
                    result,
                    json,
                    app.config.output.show_commands,
                    app.config.output.show_exit_codes,
                );
            }
            if !outcome.skipped.is_empty() {
                Ui::info(&format!("skipped (condition false): {}", outcome.skipped.join(", ")));
            }
            for (name, result) in &outcome.rollback_results {
                Ui::warning(&format!("rollback '{name}'"));
                output::emit_result(
                    result,
                    json,
                    app.config.output.show_commands,
                    app.config.output.show_exit_codes,
                );
            }
            if outcome.all_succeeded() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            output::emit_error(&e, json);
            e.exit_code()
        }
    }
}
