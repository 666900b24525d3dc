//! Console presentation helpers (SPEC_FULL §6 [AMBIENT]): colored status
//! lines plus `dialoguer`-backed confirm/select prompts. No download
//! progress bars, since sai never fetches binaries itself.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};

static QUIET: AtomicBool = AtomicBool::new(false);

pub struct Ui;

impl Ui {
    pub fn set_quiet(quiet: bool) {
        QUIET.store(quiet, Ordering::Relaxed);
    }

    pub fn is_quiet() -> bool {
        QUIET.load(Ordering::Relaxed)
    }

    pub fn success(message: &str) {
        if !Self::is_quiet() {
            println!("{} {}", "[OK]".green().bold(), message);
        }
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "[ERROR]".red().bold(), message);
    }

    pub fn warning(message: &str) {
        if !Self::is_quiet() {
            println!("{} {}", "[WARN]".yellow().bold(), message);
        }
    }

    pub fn info(message: &str) {
        if !Self::is_quiet() {
            println!("{} {}", "[INFO]".blue().bold(), message);
        }
    }

    pub fn command(line: &str) {
        if !Self::is_quiet() {
            println!("  {} {}", "$".dimmed(), line.dimmed());
        }
    }

    /// Ask yes/no with a default, honoring quiet mode by refusing to block
    /// on a terminal that output has already been suppressed for.
    pub fn confirm(message: &str, default: bool) -> bool {
        if Self::is_quiet() {
            return default;
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(default)
            .interact()
            .unwrap_or(default)
    }

    pub fn select(message: &str, options: &[String]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        if options.len() == 1 {
            return Some(0);
        }
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .items(options)
            .default(0)
            .interact_opt()
            .unwrap_or(None)
    }
}
