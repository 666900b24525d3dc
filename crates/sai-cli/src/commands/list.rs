//! `list` (spec §6 "Batch & meta"): every provider the registry loaded,
//! its availability on this host, and the actions it declares.

use colored::Colorize;
use serde::Serialize;

use crate::app::App;

#[derive(Serialize)]
struct ProviderEntry {
    name: String,
    display_name: String,
    available: bool,
    actions: Vec<String>,
}

pub fn handle(app: &App, json: bool) -> i32 {
    let registry = app.orchestrator.providers();
    let mut providers = registry.all();
    providers.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let entries: Vec<ProviderEntry> = providers
            .iter()
            .map(|p| {
                let mut actions: Vec<String> = p.actions.keys().cloned().collect();
                actions.sort();
                ProviderEntry {
                    name: p.name.clone(),
                    display_name: p.display_name.clone(),
                    available: registry.is_available(&p.name),
                    actions,
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_default());
        return 0;
    }

    if providers.is_empty() {
        println!("no providers loaded");
        return 0;
    }

    for provider in &providers {
        let marker = if registry.is_available(&provider.name) {
            "[avail]".green()
        } else {
            "[-----]".dimmed()
        };
        let mut actions: Vec<&str> = provider.actions.keys().map(String::as_str).collect();
        actions.sort();
        println!(
            "{marker} {} ({}) — {}",
            provider.name.bold(),
            provider.display_name,
            actions.join(", ")
        );
    }
    0
}
