//! Wiring (SPEC_FULL §6 [AMBIENT]): turns a loaded [`Config`] into the
//! provider registry, saidata store and orchestrator every subcommand
//! drives, assembled once at startup.

use std::path::PathBuf;
use std::sync::Arc;

use sai_config::Config;
use sai_orchestrator::{ActionOrchestrator, OrchestratorDeps};
use sai_providers::ProviderRegistry;
use sai_saidata::SaidataStore;

pub struct App {
    pub orchestrator: ActionOrchestrator,
    pub config: Config,
}

impl App {
    pub fn bootstrap(config: Config) -> Self {
        let dir = providers_dir(&config);
        let root = saidata_root(&config);
        let _ = std::fs::create_dir_all(&dir);
        let _ = std::fs::create_dir_all(&root);

        let (registry, outcome) = ProviderRegistry::load(&dir);
        for (path, error) in &outcome.failures {
            tracing::warn!(path = %path.display(), %error, "provider failed to load");
        }
        tracing::debug!(loaded = outcome.loaded, dir = %dir.display(), "providers loaded");

        let saidata = SaidataStore::new(&root);
        let orchestrator = ActionOrchestrator::new(OrchestratorDeps {
            providers: Arc::new(registry),
            saidata: Arc::new(saidata),
            config: config.clone(),
        });

        App { orchestrator, config }
    }
}

/// Directory holding provider YAML definitions (spec §6 "Provider file
/// format"). The spec leaves where providers live on disk to the
/// embedding CLI, so this follows the same precedence shape as
/// `cache_dir`: an explicit env var, then under the configured cache
/// directory, then a user-level default — documented as a CLI-level
/// addition in DESIGN.md.
pub fn providers_dir(config: &Config) -> PathBuf {
    if let Ok(dir) = std::env::var("SAI_PROVIDERS_DIR") {
        return PathBuf::from(dir);
    }
    if !config.cache_dir.is_empty() {
        return PathBuf::from(&config.cache_dir).join("providers");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".sai/providers")
}

/// Root of the local saidata hierarchy (spec §4.4, §6 "Saidata file
/// format"). `config.repository.local_path` holds this path once the
/// saidata repository has been synced locally.
pub fn saidata_root(config: &Config) -> PathBuf {
    if !config.repository.local_path.is_empty() {
        return PathBuf::from(&config.repository.local_path);
    }
    if !config.cache_dir.is_empty() {
        return PathBuf::from(&config.cache_dir).join("saidata");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".sai/saidata")
}
