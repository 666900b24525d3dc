//! ActionResult / SafetyResult / Change — the result types returned across
//! component boundaries (spec §3).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub kind: String,
    pub path: String,
    pub description: String,
}

/// Immutable once returned (spec §3 lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    pub software: String,
    /// `"multiple"` when produced by execute-across-all-providers (spec §4.9).
    pub provider: String,
    pub success: bool,
    pub error: Option<String>,
    pub output: String,
    pub commands: Vec<String>,
    pub exit_code: i32,
    pub duration: Duration,
    pub required_confirmation: bool,
    pub changes: Vec<Change>,
    /// Recovery strategy that produced a successful retry, if any (spec §4.8).
    #[serde(default)]
    pub recovered_via: Option<String>,
}

impl ActionResult {
    pub fn failed(action: &str, software: &str, provider: &str, error: impl Into<String>) -> Self {
        ActionResult {
            action: action.to_string(),
            software: software.to_string(),
            provider: provider.to_string(),
            success: false,
            error: Some(error.into()),
            output: String::new(),
            commands: Vec::new(),
            exit_code: 1,
            duration: Duration::default(),
            required_confirmation: false,
            changes: Vec::new(),
            recovered_via: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub name: String,
    pub passed: bool,
    pub messages: Vec<String>,
}

impl SafetyCheck {
    /// A message classifies as "warning" vs "error" purely by the
    /// case-insensitive substring "warning" — preserved verbatim as a
    /// design rule (spec §3).
    pub fn is_warning_message(message: &str) -> bool {
        message.to_lowercase().contains("warning")
    }

    pub fn has_error_message(&self) -> bool {
        !self.passed && self.messages.iter().any(|m| !Self::is_warning_message(m))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyResult {
    pub safe: bool,
    pub action: String,
    pub software: String,
    pub provider: String,
    pub checks: Vec<SafetyCheck>,
}

impl SafetyResult {
    /// Aggregate `safe` = no check produced an error-class message (spec §4.6).
    pub fn from_checks(action: &str, software: &str, provider: &str, checks: Vec<SafetyCheck>) -> Self {
        let safe = !checks.iter().any(|c| c.has_error_message());
        SafetyResult {
            safe,
            action: action.to_string(),
            software: software.to_string(),
            provider: provider.to_string(),
            checks,
        }
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .flat_map(|c| c.messages.iter())
            .filter(|m| !SafetyCheck::is_warning_message(m))
            .map(|s| s.as_str())
            .collect()
    }
}
