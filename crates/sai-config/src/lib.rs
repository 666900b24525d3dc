//! Configuration file discovery, layered loading and environment
//! overrides (spec §6 "Configuration file").
//!
//! Layering, via a `figment`-based config loader: built-in defaults →
//! first discovery-order YAML file that exists → `SAI_*` environment
//! variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use sai_core::{ErrorKind, Result, SaiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Confirmations {
    #[serde(default = "default_true")]
    pub install: bool,
    #[serde(default = "default_true")]
    pub uninstall: bool,
    #[serde(default = "default_true")]
    pub upgrade: bool,
    #[serde(default = "default_true")]
    pub system_changes: bool,
    #[serde(default = "default_true")]
    pub service_ops: bool,
    #[serde(default)]
    pub info_commands: bool,
}

impl Default for Confirmations {
    fn default() -> Self {
        Confirmations {
            install: true,
            uninstall: true,
            upgrade: true,
            system_changes: true,
            service_ops: true,
            info_commands: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    #[serde(default = "default_true")]
    pub provider_color: bool,
    #[serde(default = "default_command_style")]
    pub command_style: String,
    #[serde(default = "default_true")]
    pub success_color: bool,
    #[serde(default = "default_true")]
    pub error_color: bool,
    #[serde(default = "default_true")]
    pub show_commands: bool,
    #[serde(default)]
    pub show_exit_codes: bool,
}

fn default_command_style() -> String {
    "dim".to_string()
}

impl Default for Output {
    fn default() -> Self {
        Output {
            provider_color: true,
            command_style: default_command_style(),
            success_color: true,
            error_color: true,
            show_commands: true,
            show_exit_codes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    #[serde(default)]
    pub git_url: String,
    #[serde(default)]
    pub zip_fallback_url: String,
    #[serde(default)]
    pub local_path: String,
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default)]
    pub auto_setup: bool,
}

fn default_update_interval() -> u64 {
    86400
}

impl Default for Repository {
    fn default() -> Self {
        Repository {
            git_url: String::new(),
            zip_fallback_url: String::new(),
            local_path: String::new(),
            update_interval: default_update_interval(),
            offline_mode: false,
            auto_setup: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub cool_down_seconds: Option<u64>,
    #[serde(default)]
    pub success_reset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub saidata_repository: String,
    #[serde(default)]
    pub default_provider: String,
    #[serde(default)]
    pub provider_priority: HashMap<String, i32>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub cache_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub confirmations: Confirmations,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            saidata_repository: String::new(),
            default_provider: String::new(),
            provider_priority: HashMap::new(),
            timeout: default_timeout(),
            cache_dir: String::new(),
            log_level: default_log_level(),
            confirmations: Confirmations::default(),
            output: Output::default(),
            repository: Repository::default(),
            recovery: RecoveryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Discovery order from spec §6, stopping at the first path that exists.
/// `explicit` is `--config`/`-c` and always wins when given, even if the
/// path doesn't (yet) exist — the caller surfaces that as `ConfigInvalid`.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let mut candidates = vec![
        PathBuf::from("sai.yaml"),
        PathBuf::from(".sai/config.yaml"),
    ];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".sai/config.yaml"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("sai/config.yaml"));
    }
    candidates.push(PathBuf::from("/etc/sai/config.yaml"));
    candidates.push(PathBuf::from("/usr/local/etc/sai/config.yaml"));

    candidates.into_iter().find(|p| p.is_file())
}

/// Load configuration: built-in defaults, layered with the first
/// discovered YAML file (if any), layered with `SAI_*` environment
/// overrides.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = discover_config_path(explicit);

    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = &path {
        if !path.is_file() {
            return Err(SaiError::new(
                ErrorKind::ConfigInvalid,
                format!("config file '{}' does not exist", path.display()),
            )
            .with_context("path", path.display().to_string()));
        }
        figment = figment.merge(Yaml::file(path));
    }

    let mut config: Config = figment.extract().map_err(|e| {
        SaiError::new(ErrorKind::ConfigInvalid, format!("invalid configuration: {e}"))
    })?;

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("SAI_SAIDATA_REPOSITORY") {
        config.saidata_repository = v;
    }
    if let Ok(v) = std::env::var("SAI_DEFAULT_PROVIDER") {
        config.default_provider = v;
    }
    if let Ok(v) = std::env::var("SAI_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Ok(v) = std::env::var("SAI_CACHE_DIR") {
        config.cache_dir = v;
    }
    if let Ok(v) = std::env::var("SAI_TIMEOUT") {
        if let Ok(seconds) = v.parse() {
            config.timeout = seconds;
        }
    }
    if let Ok(v) = std::env::var("SAI_OFFLINE_MODE") {
        config.repository.offline_mode = parse_bool_env(&v);
    }
    if let Ok(v) = std::env::var("SAI_AUTO_SETUP") {
        config.repository.auto_setup = parse_bool_env(&v);
    }
}

fn parse_bool_env(v: &str) -> bool {
    matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible_when_no_file_and_no_env() {
        let config = Config::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.log_level, "info");
        assert!(config.confirmations.install);
    }

    #[test]
    #[serial]
    fn explicit_path_overrides_discovery_and_is_required_to_exist() {
        let err = load(Some(Path::new("/no/such/sai.yaml"))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigInvalid);
    }

    #[test]
    #[serial]
    fn yaml_file_values_layer_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sai.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "default_provider: apt\ntimeout: 99").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.default_provider, "apt");
        assert_eq!(config.timeout, 99);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    #[serial]
    fn env_vars_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sai.yaml");
        std::fs::write(&path, "timeout: 99\n").unwrap();

        std::env::set_var("SAI_TIMEOUT", "12");
        std::env::set_var("SAI_OFFLINE_MODE", "true");
        let config = load(Some(&path)).unwrap();
        std::env::remove_var("SAI_TIMEOUT");
        std::env::remove_var("SAI_OFFLINE_MODE");

        assert_eq!(config.timeout, 12);
        assert!(config.repository.offline_mode);
    }

    #[test]
    fn discover_config_path_prefers_explicit_over_cwd() {
        let explicit = Path::new("/tmp/explicit.yaml");
        assert_eq!(discover_config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }
}
