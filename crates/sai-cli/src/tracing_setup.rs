//! Logging initialization (SPEC_FULL §6 [AMBIENT]): `RUST_LOG` wins over
//! `--verbose`/`--quiet`, which win over the config's `log_level`, which
//! wins over the built-in default.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init(verbose: bool, quiet: bool, config_log_level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if verbose {
            EnvFilter::new("sai=debug,info")
        } else if quiet {
            EnvFilter::new("sai=error")
        } else if !config_log_level.is_empty() {
            EnvFilter::new(format!("sai={config_log_level}"))
        } else {
            EnvFilter::new("sai=info,warn,error")
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(verbose)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    });
}
