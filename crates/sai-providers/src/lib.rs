//! ProviderRegistry (spec §4.3): loads every provider definition from a
//! directory, schema-validates, and builds the `byName` / `byAction` /
//! `available` indexes. `Reload()` rebuilds all three atomically — readers
//! observe either the old or the new snapshot, never a partial one, by
//! swapping an `Arc` behind a lock rather than mutating in place
//! (spec §9 Design Notes: "avoid process-wide singletons").

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use sai_core::{platform::current_platform, ErrorKind, Provider, Result, SaiError};

pub struct LoadOutcome {
    pub loaded: usize,
    /// (file path, error) for files that failed to parse or validate —
    /// non-recoverable for that file only; the rest continue loading
    /// (spec §4.4 error policy, applied identically to providers).
    pub failures: Vec<(PathBuf, SaiError)>,
}

struct Snapshot {
    by_name: HashMap<String, Arc<Provider>>,
    by_action: HashMap<String, BTreeSet<String>>,
    available: HashSet<String>,
}

impl Snapshot {
    fn empty() -> Self {
        Snapshot {
            by_name: HashMap::new(),
            by_action: HashMap::new(),
            available: HashSet::new(),
        }
    }
}

pub struct ProviderRegistry {
    dir: PathBuf,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl ProviderRegistry {
    /// Load every provider definition once (spec §3 lifecycle: "Providers
    /// loaded once at registry construction, cached until explicit reload").
    pub fn load(dir: impl Into<PathBuf>) -> (Self, LoadOutcome) {
        let dir = dir.into();
        let registry = ProviderRegistry {
            dir: dir.clone(),
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
        };
        let outcome = registry.reload();
        (registry, outcome)
    }

    /// Rebuild all three indexes atomically from disk.
    pub fn reload(&self) -> LoadOutcome {
        let (providers, failures) = load_provider_files(&self.dir);
        let platform = current_platform();

        let mut by_name = HashMap::new();
        let mut by_action: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut available = HashSet::new();

        for provider in providers {
            let name = provider.name.clone();
            for action_name in provider.actions.keys() {
                by_action
                    .entry(action_name.clone())
                    .or_default()
                    .insert(name.clone());
            }
            if is_available(&provider, platform) {
                available.insert(name.clone());
            }
            by_name.insert(name, Arc::new(provider));
        }

        let loaded = by_name.len();
        let next = Arc::new(Snapshot {
            by_name,
            by_action,
            available,
        });
        *self.snapshot.write().expect("provider snapshot lock poisoned") = next;

        LoadOutcome { loaded, failures }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().expect("provider snapshot lock poisoned"))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Provider>> {
        self.snapshot().by_name.get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<Provider>> {
        self.snapshot().by_name.values().cloned().collect()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.snapshot().available.contains(name)
    }

    /// Providers declaring the given action, filtered to `available`
    /// (spec §4.3 ranking step 1).
    pub fn available_for_action(&self, action: &str) -> Vec<Arc<Provider>> {
        let snapshot = self.snapshot();
        let Some(names) = snapshot.by_action.get(action) else {
            return Vec::new();
        };
        names
            .iter()
            .filter(|n| snapshot.available.contains(*n))
            .filter_map(|n| snapshot.by_name.get(n).cloned())
            .collect()
    }

    /// Rank a pre-filtered candidate list: effective priority
    /// (`config.provider_priority[name]` if present else `provider.priority`)
    /// descending, ties broken alphabetically by name (spec §4.3 step 3).
    pub fn rank(candidates: &mut [Arc<Provider>], provider_priority: &HashMap<String, i32>) {
        candidates.sort_by(|a, b| {
            let pa = provider_priority.get(&a.name).copied().unwrap_or(a.priority);
            let pb = provider_priority.get(&b.name).copied().unwrap_or(b.priority);
            pb.cmp(&pa).then_with(|| a.name.cmp(&b.name))
        });
    }
}

fn is_available(provider: &Provider, platform: &str) -> bool {
    match &provider.executable {
        Some(exe) if !exe.is_empty() => {
            sai_probe::command_exists(exe) && provider.is_platform_supported(platform)
        }
        _ => provider.is_platform_supported(platform),
    }
}

fn load_provider_files(dir: &Path) -> (Vec<Provider>, Vec<(PathBuf, SaiError)>) {
    let mut providers = Vec::new();
    let mut failures = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return (providers, failures),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        match load_one(&path) {
            Ok(provider) => providers.push(provider),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load provider");
                failures.push((path, e));
            }
        }
    }

    (providers, failures)
}

fn load_one(path: &Path) -> Result<Provider> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SaiError::new(ErrorKind::Internal, format!("cannot read {}: {e}", path.display()))
            .with_context("path", path.display().to_string())
    })?;
    let provider: Provider = serde_yaml::from_str(&contents).map_err(|e| {
        SaiError::new(
            ErrorKind::ProviderSchemaInvalid,
            format!("failed to parse provider YAML: {e}"),
        )
        .with_context("path", path.display().to_string())
    })?;
    provider
        .validate()
        .map_err(|e| e.with_context("path", path.display().to_string()))?;
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_provider(dir: &Path, file: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    const APT_YAML: &str = r#"
name: apt
display_name: APT
type: package_manager
platforms: [linux]
executable: sh
priority: 50
actions:
  install:
    template: "apt-get install -y {{sai_package}}"
"#;

    const BROKEN_YAML: &str = "name: [this is not valid";

    #[test]
    fn loads_valid_providers_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        write_provider(dir.path(), "apt.yaml", APT_YAML);
        write_provider(dir.path(), "broken.yaml", BROKEN_YAML);
        write_provider(dir.path(), "README.md", "not a provider");

        let (registry, outcome) = ProviderRegistry::load(dir.path());
        assert_eq!(outcome.loaded, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(registry.get("apt").is_some());
    }

    #[test]
    fn available_for_action_filters_by_platform_and_executable() {
        let dir = tempfile::tempdir().unwrap();
        write_provider(dir.path(), "apt.yaml", APT_YAML);
        let (registry, _) = ProviderRegistry::load(dir.path());
        let candidates = registry.available_for_action("install");
        if cfg!(target_os = "linux") {
            assert_eq!(candidates.len(), 1);
        }
    }

    #[test]
    fn rank_prefers_config_override_over_provider_priority() {
        let low = Arc::new(Provider {
            name: "low".to_string(),
            display_name: String::new(),
            provider_type: sai_core::ProviderType::PackageManager,
            platforms: Default::default(),
            executable: Some("sh".to_string()),
            priority: 1,
            capabilities: Default::default(),
            actions: Default::default(),
        });
        let high = Arc::new(Provider {
            name: "high".to_string(),
            priority: 100,
            ..(*low).clone()
        });
        let mut candidates = vec![low.clone(), high.clone()];
        let mut overrides = HashMap::new();
        overrides.insert("low".to_string(), 1000);
        ProviderRegistry::rank(&mut candidates, &overrides);
        assert_eq!(candidates[0].name, "low");
    }

    #[test]
    fn reload_is_atomic_for_concurrent_readers() {
        let dir = tempfile::tempdir().unwrap();
        write_provider(dir.path(), "apt.yaml", APT_YAML);
        let (registry, _) = ProviderRegistry::load(dir.path());
        assert!(registry.get("apt").is_some());
        std::fs::remove_file(dir.path().join("apt.yaml")).unwrap();
        registry.reload();
        assert!(registry.get("apt").is_none());
    }
}
