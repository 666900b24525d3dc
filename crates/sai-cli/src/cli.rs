//! CLI surface (spec §6): subcommands, global flags and their
//! mutual-exclusion rules, built with `clap`'s derive API.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sai")]
#[command(about = "Universal software-management command-line tool")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Load configuration from this path instead of the discovery order.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Force a specific provider instead of ranking/prompting.
    #[arg(short = 'p', long = "provider", global = true)]
    pub provider: Option<String>,

    /// Verbose logging.
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Assume yes to all confirmation prompts.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Render the commands that would run without executing them.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Emit machine-readable JSON instead of human-formatted text.
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct VariableArgs {
    /// Template variable in `key=value` form; may be repeated.
    #[arg(long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected key=value, got '{s}'")),
    }
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Install software (spec §6 "Software management").
    Install {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Uninstall software.
    Uninstall {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Upgrade software to the latest available version.
    Upgrade {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Search for software across every available provider.
    Search {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Show detailed information about software.
    Info {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Show sai's own version, or a software's installed version.
    Version { software: Option<String> },

    /// Start a service (spec §6 "Service management").
    Start {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Stop a service.
    Stop {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Restart a service.
    Restart {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Enable a service to start at boot.
    Enable {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Disable a service from starting at boot.
    Disable {
        software: String,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// Show service status.
    Status { software: String },

    /// Show recent logs (spec §6 "Monitoring").
    Logs { software: Option<String> },
    /// Show CPU usage.
    Cpu { software: Option<String> },
    /// Show memory usage.
    Memory { software: Option<String> },
    /// Show I/O usage.
    Io { software: Option<String> },
    /// Run a health check.
    Check { software: String },
    /// Show the effective configuration for a piece of software.
    Config { software: String },

    /// Run a declarative batch of actions from a file (spec §6 "Batch & meta").
    Apply {
        file: PathBuf,
        #[command(flatten)]
        variables: VariableArgs,
    },
    /// List every loaded provider and the actions it supports.
    List,
    /// Show aggregate statistics: loaded providers, cache sizes, recent errors.
    Stats,
    /// Manage the local saidata cache/repository.
    Saidata {
        #[command(subcommand)]
        command: SaidataCommand,
    },
}

#[derive(Subcommand, Clone)]
pub enum SaidataCommand {
    /// Show the saidata repository's local path and sync state.
    Status,
    /// Fetch the latest saidata repository contents.
    Update,
    /// Alias for `update` (sync local saidata with the upstream repository).
    Sync,
    /// Create the local saidata directory layout if missing.
    Init,
    /// Clear the in-memory and on-disk saidata caches.
    Clean,
}

impl Commands {
    /// The spec action name this subcommand maps to, for subcommands that
    /// go straight through `ActionOrchestrator::execute_action` (spec §4.9).
    /// `Apply`/`List`/`Stats`/`Saidata` have their own drivers and return
    /// `None`.
    pub fn action_name(&self) -> Option<&'static str> {
        match self {
            Commands::Install { .. } => Some("install"),
            Commands::Uninstall { .. } => Some("uninstall"),
            Commands::Upgrade { .. } => Some("upgrade"),
            Commands::Search { .. } => Some("search"),
            Commands::Info { .. } => Some("info"),
            Commands::Version { .. } => Some("version"),
            Commands::Start { .. } => Some("start"),
            Commands::Stop { .. } => Some("stop"),
            Commands::Restart { .. } => Some("restart"),
            Commands::Enable { .. } => Some("enable"),
            Commands::Disable { .. } => Some("disable"),
            Commands::Status { .. } => Some("status"),
            Commands::Logs { .. } => Some("logs"),
            Commands::Cpu { .. } => Some("cpu"),
            Commands::Memory { .. } => Some("memory"),
            Commands::Io { .. } => Some("io"),
            Commands::Check { .. } => Some("check"),
            Commands::Config { .. } => Some("config"),
            Commands::Apply { .. }
            | Commands::List
            | Commands::Stats
            | Commands::Saidata { .. } => None,
        }
    }

    /// The software id named on the command line, when the subcommand
    /// takes one; monitoring actions accept an optional software and fall
    /// back to `"system"` as a stand-in target when omitted (no specific
    /// software was named, so the probe is host-wide).
    pub fn software(&self) -> Option<String> {
        match self {
            Commands::Install { software, .. }
            | Commands::Uninstall { software, .. }
            | Commands::Upgrade { software, .. }
            | Commands::Search { software, .. }
            | Commands::Info { software, .. }
            | Commands::Start { software, .. }
            | Commands::Stop { software, .. }
            | Commands::Restart { software, .. }
            | Commands::Enable { software, .. }
            | Commands::Disable { software, .. }
            | Commands::Status { software }
            | Commands::Check { software }
            | Commands::Config { software } => Some(software.clone()),
            Commands::Version { software }
            | Commands::Logs { software }
            | Commands::Cpu { software }
            | Commands::Memory { software }
            | Commands::Io { software } => Some(software.clone().unwrap_or_else(|| "system".to_string())),
            Commands::Apply { .. } | Commands::List | Commands::Stats | Commands::Saidata { .. } => None,
        }
    }

    pub fn variables(&self) -> Vec<(String, String)> {
        match self {
            Commands::Install { variables, .. }
            | Commands::Uninstall { variables, .. }
            | Commands::Upgrade { variables, .. }
            | Commands::Search { variables, .. }
            | Commands::Info { variables, .. }
            | Commands::Start { variables, .. }
            | Commands::Stop { variables, .. }
            | Commands::Restart { variables, .. }
            | Commands::Enable { variables, .. }
            | Commands::Disable { variables, .. } => variables.vars.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_and_quiet_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["sai", "-v", "-q", "list"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn json_and_quiet_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["sai", "--json", "-q", "list"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn install_parses_software_and_variables() {
        let cli = Cli::try_parse_from(["sai", "install", "nginx", "--var", "port=8080"]).unwrap();
        assert_eq!(cli.command.software(), Some("nginx".to_string()));
        assert_eq!(cli.command.action_name(), Some("install"));
        assert_eq!(cli.command.variables(), vec![("port".to_string(), "8080".to_string())]);
    }

    #[test]
    fn version_software_is_optional() {
        let cli = Cli::try_parse_from(["sai", "version"]).unwrap();
        assert_eq!(cli.command.software(), Some("system".to_string()));
    }
}
