//! `stats` (spec §6 "Batch & meta"): loaded/available provider counts and
//! a tail of the error ring buffer sai-orchestrator keeps (spec §7).

use serde::Serialize;

use crate::app::App;

#[derive(Serialize)]
struct Stats {
    providers_loaded: usize,
    providers_available: usize,
    recent_errors: usize,
}

pub async fn handle(app: &App, json: bool) -> i32 {
    let registry = app.orchestrator.providers();
    let providers = registry.all();
    let available = providers.iter().filter(|p| registry.is_available(&p.name)).count();
    let errors = app.orchestrator.recent_errors().await;

    if json {
        let stats = Stats {
            providers_loaded: providers.len(),
            providers_available: available,
            recent_errors: errors.len(),
        };
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        return 0;
    }

    println!("providers loaded:     {}", providers.len());
    println!("providers available:  {available}");
    println!("recent errors:        {}", errors.len());
    for error in errors.iter().rev().take(5) {
        println!("  - {}: {}", error.kind, error.message);
    }
    0
}
