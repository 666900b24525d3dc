//! Provider and Action data model (spec §3, "Provider" / "Action").

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{ErrorKind, Result, SaiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    PackageManager,
    ContainerRuntime,
    ServiceManager,
    LanguageRuntimePkg,
    SourceBuild,
}

/// An ordered step within a multi-step [`Action`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub rollback: Option<String>,
    #[serde(default)]
    pub on_failure: OnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    #[default]
    Stop,
    Continue,
    Rollback,
}

/// Optional probe spec used by an action's `validation` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValidationSpec {
    FileExists { path: String },
    DirExists { path: String },
    CommandExists { name: String },
    ServiceExists { name: String, service_type: String },
    PortValid { port: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    steps: Option<Vec<Step>>,
    #[serde(default)]
    pub detection: Option<String>,
    #[serde(default)]
    pub requires_root: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub validation: Option<ValidationSpec>,
    /// Declares the action safe to retry verbatim after a failure or
    /// timeout (spec §7: `ExecutionFailed`/`ActionTimeout` recoverability).
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub retriable: bool,
    /// When set, Executor records filesystem/service deltas (spec §4.7);
    /// left empty unless a provider chooses to populate it.
    #[serde(default)]
    pub changes_discovery: bool,
    /// Resource-existence check is mandatory even for warning-class misses
    /// (spec §4.6 check 1).
    #[serde(default)]
    pub requires_strict: bool,
}

fn default_timeout() -> u64 {
    30
}

impl Action {
    pub fn new_template(template: impl Into<String>) -> Self {
        Self {
            description: String::new(),
            template: Some(template.into()),
            steps: None,
            detection: None,
            requires_root: false,
            timeout: default_timeout(),
            validation: None,
            idempotent: false,
            retriable: false,
            changes_discovery: false,
            requires_strict: false,
        }
    }

    pub fn new_steps(steps: Vec<Step>) -> Self {
        Self {
            description: String::new(),
            template: None,
            steps: Some(steps),
            detection: None,
            requires_root: false,
            timeout: default_timeout(),
            validation: None,
            idempotent: false,
            retriable: false,
            changes_discovery: false,
            requires_strict: false,
        }
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn steps(&self) -> Option<&[Step]> {
        self.steps.as_deref()
    }

    /// Exactly one of `template`/`steps` must be present (spec §3 "Action").
    pub fn validate(&self, provider_name: &str, action_name: &str) -> Result<()> {
        match (&self.template, &self.steps) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (None, None) => Err(SaiError::new(
                ErrorKind::ProviderSchemaInvalid,
                format!(
                    "provider '{provider_name}' action '{action_name}' declares neither template nor steps"
                ),
            )),
            (Some(_), Some(_)) => Err(SaiError::new(
                ErrorKind::ProviderSchemaInvalid,
                format!(
                    "provider '{provider_name}' action '{action_name}' declares both template and steps"
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    pub actions: HashMap<String, Action>,
}

impl Provider {
    /// Structural invariants from spec §3: platforms non-empty when
    /// `executable` is unset, ports validated elsewhere per-resource.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SaiError::new(
                ErrorKind::ProviderSchemaInvalid,
                "provider name must not be empty",
            ));
        }
        if self.executable.is_none() && self.platforms.is_empty() {
            return Err(SaiError::new(
                ErrorKind::ProviderSchemaInvalid,
                format!(
                    "provider '{}' has no executable and no platforms declared",
                    self.name
                ),
            )
            .with_context("provider", self.name.clone()));
        }
        for (action_name, action) in &self.actions {
            if action.timeout == 0 {
                return Err(SaiError::new(
                    ErrorKind::ProviderSchemaInvalid,
                    format!(
                        "provider '{}' action '{}' has non-positive timeout",
                        self.name, action_name
                    ),
                ));
            }
            action.validate(&self.name, action_name)?;
        }
        Ok(())
    }

    pub fn is_platform_supported(&self, platform: &str) -> bool {
        self.platforms.is_empty() || self.platforms.contains(platform)
    }
}
