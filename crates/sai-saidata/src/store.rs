//! SaidataStore (spec §4.4): locate base + OS-override YAML for a software
//! id, deep-merge, or fall back to DefaultsGenerator.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sai_core::{merge::merge_saidata, ErrorKind, Result, SaiError, Saidata};

use crate::os::{detect_host_os, HostOs};

/// `prefix(s)`: lowercased first two characters, padded with `'x'` when
/// `len(s) < 2` (spec §4.4 step 1; invariant in spec §8).
pub fn prefix(software: &str) -> String {
    let lower = software.to_lowercase();
    let mut chars: Vec<char> = lower.chars().take(2).collect();
    while chars.len() < 2 {
        chars.push('x');
    }
    chars.into_iter().collect()
}

fn base_candidates(root: &Path, prefix: &str, software: &str) -> [PathBuf; 2] {
    [
        root.join("software").join(prefix).join(software).join("default.yaml"),
        root.join(prefix).join(software).join("default.yaml"),
    ]
}

fn override_candidates(root: &Path, prefix: &str, software: &str, host: &HostOs) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if !host.version.is_empty() {
        candidates.push(
            root.join("software")
                .join(prefix)
                .join(software)
                .join(&host.family)
                .join(format!("{}.yaml", host.version)),
        );
        candidates.push(
            root.join(prefix)
                .join(software)
                .join(&host.family)
                .join(format!("{}.yaml", host.version)),
        );
    }
    candidates.push(
        root.join("software")
            .join(prefix)
            .join(software)
            .join(&host.family)
            .join("default.yaml"),
    );
    candidates.push(
        root.join(prefix)
            .join(software)
            .join(&host.family)
            .join("default.yaml"),
    );
    candidates
}

fn load_yaml(path: &Path) -> Result<Saidata> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SaiError::new(ErrorKind::Internal, format!("cannot read {}: {e}", path.display()))
            .with_context("path", path.display().to_string())
    })?;
    let saidata: Saidata = serde_yaml::from_str(&contents).map_err(|e| {
        SaiError::new(
            ErrorKind::YamlParse,
            format!("failed to parse saidata YAML: {e}"),
        )
        .with_context("path", path.display().to_string())
    })?;
    Ok(saidata)
}

pub struct SaidataStore {
    root: PathBuf,
    /// Lazily populated, cached for process lifetime (spec §3 lifecycle).
    cache: Mutex<HashMap<String, Saidata>>,
}

impl SaidataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SaidataStore {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Invalidate the cache — used by Recovery's "refresh saidata" strategy
    /// (spec §4.8).
    pub fn invalidate(&self, software: &str) {
        self.cache.lock().expect("saidata cache lock poisoned").remove(software);
    }

    pub fn invalidate_all(&self) {
        self.cache.lock().expect("saidata cache lock poisoned").clear();
    }

    pub fn resolve(&self, software: &str) -> Result<Saidata> {
        if let Some(cached) = self.cache.lock().expect("saidata cache lock poisoned").get(software) {
            return Ok(cached.clone());
        }
        let resolved = self.resolve_uncached(software)?;
        self.cache
            .lock()
            .expect("saidata cache lock poisoned")
            .insert(software.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(&self, software: &str) -> Result<Saidata> {
        let prefix = prefix(software);
        let base_path = base_candidates(&self.root, &prefix, software)
            .into_iter()
            .find(|p| p.is_file());

        let Some(base_path) = base_path else {
            tracing::info!(software, "no saidata found, generating intelligent defaults");
            return Ok(crate::defaults::generate(software));
        };

        let base = load_yaml(&base_path)?;
        let host = detect_host_os();

        let mut merged = base;
        let mut applied = false;
        for candidate in override_candidates(&self.root, &prefix, software, &host) {
            if candidate.is_file() {
                let override_data = load_yaml(&candidate)?;
                merged = merge_saidata(merged, override_data);
                applied = true;
                break;
            }
        }
        if !applied {
            tracing::info!(software, os = %host.family, "no OS override found (benign)");
        }

        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn prefix_is_two_lowercase_chars_even_for_short_ids() {
        assert_eq!(prefix("Nginx"), "ng");
        assert_eq!(prefix("a"), "ax");
        assert_eq!(prefix(""), "xx");
    }

    #[test]
    #[serial]
    fn hierarchical_override_merge_replaces_matching_fields() {
        let root = tempfile::tempdir().unwrap();
        let prefix = prefix("apache");
        write(
            &root
                .path()
                .join("software")
                .join(&prefix)
                .join("apache")
                .join("default.yaml"),
            r#"
version: "0.2"
metadata:
  name: apache
packages:
  - name: apache2
    version: "2.4.58"
"#,
        );
        write(
            &root
                .path()
                .join("software")
                .join(&prefix)
                .join("apache")
                .join("ubuntu")
                .join("22.04.yaml"),
            r#"
version: "0.2"
packages:
  - name: apache2
    version: "2.4.52-1ubuntu4"
"#,
        );

        std::env::set_var("SAI_TEST_OS", "ubuntu");
        std::env::set_var("SAI_TEST_OS_VERSION", "22.04");
        let store = SaidataStore::new(root.path());
        let resolved = store.resolve("apache").unwrap();
        std::env::remove_var("SAI_TEST_OS");
        std::env::remove_var("SAI_TEST_OS_VERSION");

        assert_eq!(resolved.resources.packages.len(), 1);
        assert_eq!(resolved.resources.packages[0].version, "2.4.52-1ubuntu4");
        assert!(!resolved.is_generated);
    }

    #[test]
    #[serial]
    fn missing_saidata_falls_back_to_generated_defaults() {
        let root = tempfile::tempdir().unwrap();
        std::env::set_var("SAI_TEST_OS", "ubuntu");
        std::env::set_var("SAI_TEST_OS_VERSION", "22.04");
        let store = SaidataStore::new(root.path());
        let resolved = store.resolve("flibber").unwrap();
        std::env::remove_var("SAI_TEST_OS");
        std::env::remove_var("SAI_TEST_OS_VERSION");
        assert!(resolved.is_generated);
        assert_eq!(resolved.resources.packages[0].name, "flibber");
    }

    #[test]
    fn resolve_caches_for_process_lifetime() {
        let root = tempfile::tempdir().unwrap();
        let prefix = prefix("nginx");
        write(
            &root
                .path()
                .join("software")
                .join(&prefix)
                .join("nginx")
                .join("default.yaml"),
            "version: \"0.2\"\npackages:\n  - name: nginx\n",
        );
        let store = SaidataStore::new(root.path());
        let first = store.resolve("nginx").unwrap();
        std::fs::remove_file(
            root.path()
                .join("software")
                .join(&prefix)
                .join("nginx")
                .join("default.yaml"),
        )
        .unwrap();
        let second = store.resolve("nginx").unwrap();
        assert_eq!(first, second);
    }
}
