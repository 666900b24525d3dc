//! Apply-file batch driver (spec §4 SUPPLEMENT): runs a declared sequence
//! of actions from a YAML/JSON manifest through the same
//! [`ActionOrchestrator::execute_action`] path a single interactive
//! invocation would use, honoring each action's `on_failure` policy and a
//! top-level `rollback` list for already-completed entries.

use std::collections::HashMap;
use std::time::Duration;

use sai_core::{ActionResult, ErrorKind, OnFailure, Result, SaiError};
use serde::{Deserialize, Serialize};

use crate::orchestrator::{ActionOrchestrator, Confirmer, ExecuteRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyAction {
    pub name: String,
    pub action: String,
    pub software: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Boolean template expression (spec §4 SUPPLEMENT), re-using the same
    /// placeholder syntax as provider templates. Skipped when it renders
    /// empty, `"false"` or `"0"`.
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub on_failure: OnFailure,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyFile {
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    pub actions: Vec<ApplyAction>,
    #[serde(default)]
    pub rollback: Vec<ApplyAction>,
}

impl ApplyFile {
    /// Parses YAML or JSON, sniffed by the first non-whitespace byte,
    /// since an apply file is allowed to be either.
    pub fn parse(contents: &str) -> Result<Self> {
        let trimmed = contents.trim_start();
        let parsed = if trimmed.starts_with('{') {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(contents).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| {
            SaiError::new(ErrorKind::YamlParse, format!("invalid apply file: {message}"))
        })
    }
}

#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// One entry per action actually run, in execution order, excluding
    /// entries skipped by an unmet `condition`.
    pub results: Vec<(String, ActionResult)>,
    /// Names of actions skipped because their `condition` rendered falsy.
    pub skipped: Vec<String>,
    /// Set once a `stop` or `rollback` policy ends the run early.
    pub stopped_early: bool,
    /// Populated only when a failing action's `on_failure` was `rollback`;
    /// one entry per already-completed action that had a matching
    /// `rollback` entry, run in reverse completion order.
    pub rollback_results: Vec<(String, ActionResult)>,
}

impl ApplyOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|(_, r)| r.success)
    }
}

/// Drives an apply file to completion (spec §4 SUPPLEMENT). `overrides`
/// are caller-supplied variables (e.g. `--var` on the CLI) that win over
/// both the file-level and per-action `variables` maps. `assume_yes`
/// mirrors the CLI's `--yes`: batch runs are typically unattended, but the
/// driver still goes through `confirmer` when it isn't set, exactly like
/// a single `execute_action` call.
pub async fn run_apply_file(
    orchestrator: &ActionOrchestrator,
    contents: &str,
    overrides: &HashMap<String, String>,
    assume_yes: bool,
    confirmer: &dyn Confirmer,
) -> Result<ApplyOutcome> {
    let file = ApplyFile::parse(contents)?;
    let mut outcome = ApplyOutcome::default();
    let mut completed: Vec<ApplyAction> = Vec::new();

    for step in &file.actions {
        let variables = merged_variables(&file.variables, &step.variables, overrides);

        if let Some(condition) = &step.condition {
            if !evaluate_condition(orchestrator, condition, &step.software, &variables).await {
                tracing::debug!(action = step.name.as_str(), "apply step skipped: condition false");
                outcome.skipped.push(step.name.clone());
                continue;
            }
        }

        let result = run_one(orchestrator, step, variables, assume_yes, confirmer).await;
        let succeeded = result.success;
        outcome.results.push((step.name.clone(), result));

        if succeeded {
            completed.push(step.clone());
            continue;
        }

        match step.on_failure {
            OnFailure::Continue => continue,
            OnFailure::Stop => {
                outcome.stopped_early = true;
                break;
            }
            OnFailure::Rollback => {
                outcome.stopped_early = true;
                outcome.rollback_results =
                    run_rollback(orchestrator, &file, &completed, overrides, assume_yes, confirmer)
                        .await;
                break;
            }
        }
    }

    Ok(outcome)
}

async fn run_one(
    orchestrator: &ActionOrchestrator,
    step: &ApplyAction,
    variables: HashMap<String, String>,
    assume_yes: bool,
    confirmer: &dyn Confirmer,
) -> ActionResult {
    let mut req = ExecuteRequest::new(&step.action, &step.software);
    req.provider = step.provider.clone();
    req.variables = variables;
    req.yes = assume_yes;
    if let Some(seconds) = step.timeout {
        req.timeout = Some(Duration::from_secs(seconds));
    }
    orchestrator.execute_action(req, confirmer).await
}

/// Undoes already-completed actions, most recent first, running the
/// `rollback` entry whose `name` matches the completed action's `name`.
/// A completed action with no matching rollback entry is left as-is —
/// the file's author chose not to declare how to undo it.
async fn run_rollback(
    orchestrator: &ActionOrchestrator,
    file: &ApplyFile,
    completed: &[ApplyAction],
    overrides: &HashMap<String, String>,
    assume_yes: bool,
    confirmer: &dyn Confirmer,
) -> Vec<(String, ActionResult)> {
    let mut results = Vec::new();
    for step in completed.iter().rev() {
        let Some(rollback_step) = file.rollback.iter().find(|r| r.name == step.name) else {
            tracing::debug!(action = step.name.as_str(), "no rollback entry declared, leaving as-is");
            continue;
        };
        let variables = merged_variables(&file.variables, &rollback_step.variables, overrides);
        let result = run_one(orchestrator, rollback_step, variables, assume_yes, confirmer).await;
        results.push((rollback_step.name.clone(), result));
    }
    results
}

fn merged_variables(
    file_vars: &HashMap<String, String>,
    step_vars: &HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged = file_vars.clone();
    merged.extend(step_vars.clone());
    merged.extend(overrides.clone());
    merged
}

async fn evaluate_condition(
    orchestrator: &ActionOrchestrator,
    condition: &str,
    software: &str,
    variables: &HashMap<String, String>,
) -> bool {
    let saidata = orchestrator.saidata().resolve(software).unwrap_or_default();
    let ctx = sai_template::Context {
        saidata: &saidata,
        provider_name: "",
        variables,
        software,
        safety_mode: false,
    };
    match sai_template::render(condition, &ctx) {
        Ok(rendered) => is_truthy(&rendered),
        Err(e) => {
            tracing::debug!(condition, error = %e, "apply condition failed to render, treating as false");
            false
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !v.eq_ignore_ascii_case("false") && v != "0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{AutoConfirm, OrchestratorDeps};
    use sai_config::Config;
    use sai_core::{Action, Provider as CoreProvider, ProviderType};
    use sai_providers::ProviderRegistry;
    use sai_saidata::SaidataStore;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn provider(name: &str) -> CoreProvider {
        let mut actions = HashMap::new();
        actions.insert("install".to_string(), Action::new_template("echo install {{sai_package}}"));
        actions.insert("uninstall".to_string(), Action::new_template("echo remove {{sai_package}}"));
        CoreProvider {
            name: name.to_string(),
            display_name: name.to_string(),
            provider_type: ProviderType::PackageManager,
            platforms: BTreeSet::new(),
            executable: Some("sh".to_string()),
            priority: 50,
            capabilities: BTreeSet::new(),
            actions,
        }
    }

    fn orchestrator_with_apt() -> (tempfile::TempDir, tempfile::TempDir, ActionOrchestrator) {
        let providers_dir = tempfile::tempdir().unwrap();
        let yaml = serde_yaml::to_string(&provider("apt")).unwrap();
        std::fs::write(providers_dir.path().join("apt.yaml"), yaml).unwrap();
        let (registry, _) = ProviderRegistry::load(providers_dir.path());

        let saidata_dir = tempfile::tempdir().unwrap();
        let orchestrator = ActionOrchestrator::new(OrchestratorDeps {
            providers: Arc::new(registry),
            saidata: Arc::new(SaidataStore::new(saidata_dir.path())),
            config: Config::default(),
        });
        (providers_dir, saidata_dir, orchestrator)
    }

    #[tokio::test]
    async fn runs_actions_in_order_and_reports_all_results() {
        let (_p, _s, orchestrator) = orchestrator_with_apt();
        let file = r#"
version: "1"
actions:
  - name: install-nginx
    action: install
    software: nginx
  - name: install-redis
    action: install
    software: redis
"#;
        let outcome = run_apply_file(&orchestrator, file, &HashMap::new(), true, &AutoConfirm)
            .await
            .unwrap();
        assert!(outcome.all_succeeded());
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].0, "install-nginx");
        assert!(!outcome.stopped_early);
    }

    #[tokio::test]
    async fn stop_policy_halts_after_first_failure() {
        let (_p, _s, orchestrator) = orchestrator_with_apt();
        let file = r#"
version: "1"
actions:
  - name: bad
    action: frobnicate
    software: nginx
  - name: never-runs
    action: install
    software: redis
"#;
        let outcome = run_apply_file(&orchestrator, file, &HashMap::new(), true, &AutoConfirm)
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.stopped_early);
        assert!(!outcome.all_succeeded());
    }

    #[tokio::test]
    async fn continue_policy_runs_every_action_regardless_of_failure() {
        let (_p, _s, orchestrator) = orchestrator_with_apt();
        let file = r#"
version: "1"
actions:
  - name: bad
    action: frobnicate
    software: nginx
    on_failure: continue
  - name: good
    action: install
    software: redis
"#;
        let outcome = run_apply_file(&orchestrator, file, &HashMap::new(), true, &AutoConfirm)
            .await
            .unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert!(!outcome.stopped_early);
        assert!(outcome.results[1].1.success);
    }

    #[tokio::test]
    async fn falsy_condition_skips_the_action() {
        let (_p, _s, orchestrator) = orchestrator_with_apt();
        let file = r#"
version: "1"
actions:
  - name: conditional
    action: install
    software: nginx
    condition: "{{var.enabled}}"
    variables:
      enabled: "false"
"#;
        let outcome = run_apply_file(&orchestrator, file, &HashMap::new(), true, &AutoConfirm)
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.skipped, vec!["conditional".to_string()]);
    }

    #[tokio::test]
    async fn rollback_policy_undoes_completed_actions_in_reverse() {
        let (_p, _s, orchestrator) = orchestrator_with_apt();
        let file = r#"
version: "1"
actions:
  - name: install-nginx
    action: install
    software: nginx
  - name: bad
    action: frobnicate
    software: redis
    on_failure: rollback
rollback:
  - name: install-nginx
    action: uninstall
    software: nginx
"#;
        let outcome = run_apply_file(&orchestrator, file, &HashMap::new(), true, &AutoConfirm)
            .await
            .unwrap();
        assert!(outcome.stopped_early);
        assert_eq!(outcome.rollback_results.len(), 1);
        assert_eq!(outcome.rollback_results[0].0, "install-nginx");
        assert!(outcome.rollback_results[0].1.output.contains("remove nginx"));
    }

    #[test]
    fn parses_json_and_yaml_by_sniffing_first_byte() {
        let yaml = "version: \"1\"\nactions: []\n";
        assert_eq!(ApplyFile::parse(yaml).unwrap().version, "1");

        let json = r#"{"version": "1", "actions": []}"#;
        assert_eq!(ApplyFile::parse(json).unwrap().version, "1");

        let bad = "not: [valid";
        assert_eq!(ApplyFile::parse(bad).unwrap_err().kind, ErrorKind::YamlParse);
    }
}
