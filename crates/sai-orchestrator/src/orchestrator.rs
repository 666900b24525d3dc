//! ActionOrchestrator (spec §4.9): the end-to-end workflow — validate,
//! resolve, filter providers, safety-check, confirm, render, execute,
//! recover, report — plus the execute-across-all-providers mode for
//! information-only actions (§4.9) and the mutation mutex (§5).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sai_config::Config;
use sai_core::{ActionResult, ErrorKind, Provider, SaiError, Saidata};
use sai_executor::{breaker_key, recover, CircuitBreaker, ExecutionOptions, RecoveryStrategy};
use sai_providers::ProviderRegistry;
use sai_safety::EvaluationContext;
use sai_saidata::SaidataStore;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

/// Declared read-only; executed across every available provider without
/// prompting for a single one (spec §4.9 step 5, glossary
/// "Information-only action").
pub const INFORMATION_ONLY_ACTIONS: &[&str] = &[
    "search", "info", "version", "status", "logs", "config", "check", "cpu", "memory", "io",
    "list", "stats",
];

/// Mutates host state; subject to confirmation and the mutation mutex
/// (spec §5, §4.9 step 7, glossary "System-changing action").
pub const SYSTEM_CHANGING_ACTIONS: &[&str] = &[
    "install", "uninstall", "upgrade", "start", "stop", "restart", "enable", "disable",
];

const DESTRUCTIVE_ACTIONS: &[&str] = &["uninstall", "stop", "disable"];

const ERROR_RING_CAPACITY: usize = 1000;

/// A candidate provider plus the commands a dry render would run against
/// it, shown to the confirmation collaborator before selection or
/// confirmation (spec §4.9 step 5: "supplying a command preview per
/// candidate").
pub struct ProviderPreview {
    pub provider: String,
    pub commands: Vec<String>,
}

pub struct ConfirmContext<'a> {
    pub action: &'a str,
    pub software: &'a str,
    pub provider: &'a str,
    pub commands: &'a [String],
    pub destructive: bool,
}

/// The UI collaborator the orchestrator prompts through. Implemented by
/// `sai-cli` (dialoguer-backed in interactive mode, or an always-yes /
/// always-no stub for tests) — never by this crate itself (spec §9
/// Design Notes: keep caches and UI owned by the edges, not the core).
pub trait Confirmer: Send + Sync {
    /// Ask the user to pick one of several candidate providers for an
    /// information-only... no: for a system-changing action with more than
    /// one viable provider and no forced selection. `None` means the user
    /// declined to choose (treated as cancellation).
    fn select_provider(
        &self,
        action: &str,
        software: &str,
        candidates: &[ProviderPreview],
    ) -> Option<String>;

    /// Ask for go-ahead before a system-changing action runs. Destructive
    /// actions pass `destructive: true` and should be held to a stricter
    /// prompt (spec §4.9 step 7).
    fn confirm(&self, ctx: &ConfirmContext) -> bool;
}

/// Always-approve confirmer: used when `--yes`/info-only bypasses prompting
/// entirely, and convenient for tests.
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn select_provider(
        &self,
        _action: &str,
        _software: &str,
        candidates: &[ProviderPreview],
    ) -> Option<String> {
        candidates.first().map(|p| p.provider.clone())
    }

    fn confirm(&self, _ctx: &ConfirmContext) -> bool {
        true
    }
}

pub struct OrchestratorDeps {
    pub providers: Arc<ProviderRegistry>,
    pub saidata: Arc<SaidataStore>,
    pub config: Config,
}

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub action: String,
    pub software: String,
    /// Caller-forced provider (`--provider`/`-p`); bypasses ranking and
    /// the execute-across-all-providers mode (spec §4.9 step 5).
    pub provider: Option<String>,
    pub variables: HashMap<String, String>,
    /// `--yes`/`-y`: skips confirmation and forces the first ranked
    /// candidate instead of prompting.
    pub yes: bool,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
}

impl ExecuteRequest {
    pub fn new(action: impl Into<String>, software: impl Into<String>) -> Self {
        ExecuteRequest {
            action: action.into(),
            software: software.into(),
            provider: None,
            variables: HashMap::new(),
            yes: false,
            dry_run: false,
            timeout: None,
        }
    }
}

/// The top-level workflow driver (spec §4.9). Holds no state beyond the
/// caches already owned by its dependencies, plus the breaker registry,
/// the mutation gate, and the terminal-error ring buffer (spec §7) that
/// are this orchestrator's own responsibility.
pub struct ActionOrchestrator {
    deps: OrchestratorDeps,
    breakers: AsyncMutex<HashMap<String, Arc<CircuitBreaker>>>,
    /// Serializes any two actions in [`SYSTEM_CHANGING_ACTIONS`] to avoid
    /// package-manager contention; information-only actions never take
    /// this lock (spec §5).
    mutation_gate: AsyncMutex<()>,
    errors: AsyncMutex<VecDeque<SaiError>>,
}

impl ActionOrchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        ActionOrchestrator {
            deps,
            breakers: AsyncMutex::new(HashMap::new()),
            mutation_gate: AsyncMutex::new(()),
            errors: AsyncMutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.deps.config
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.deps.providers
    }

    pub fn saidata(&self) -> &SaidataStore {
        &self.deps.saidata
    }

    /// Snapshot of terminal errors recorded this process (spec §7 ring
    /// buffer), most recent last.
    pub async fn recent_errors(&self) -> Vec<SaiError> {
        self.errors.lock().await.iter().map(clone_error).collect()
    }

    async fn record_error(&self, error: &SaiError) {
        let mut ring = self.errors.lock().await;
        if ring.len() >= ERROR_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(clone_error(error));
    }

    async fn breaker_for(&self, key: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                let cb = &self.deps.config.circuit_breaker;
                Arc::new(CircuitBreaker::new(
                    cb.failure_threshold.unwrap_or(5),
                    Duration::from_secs(cb.cool_down_seconds.unwrap_or(30)),
                    cb.success_reset.unwrap_or(2),
                ))
            })
            .clone()
    }

    /// Run one action end-to-end (spec §4.9 steps 1-9). Step 10 (emit) is
    /// the CLI's job: this returns the assembled [`ActionResult`].
    pub async fn execute_action(
        &self,
        req: ExecuteRequest,
        confirmer: &dyn Confirmer,
    ) -> ActionResult {
        let start = Instant::now();

        // Step 1: validate the action is known to at least one available
        // provider before doing any further work.
        if self.deps.providers.available_for_action(&req.action).is_empty() {
            return self.fail(
                &req,
                start,
                "multiple",
                SaiError::new(
                    ErrorKind::ActionNotSupported,
                    format!("no available provider supports action '{}'", req.action),
                ),
            )
            .await;
        }

        // Step 2: resolve saidata.
        let saidata = match self.deps.saidata.resolve(&req.software) {
            Ok(s) => s,
            Err(e) => return self.fail(&req, start, "multiple", e).await,
        };

        // Step 3: setup repositories, best-effort (spec §4.9 step 3: OS-level
        // registration is provider-plugin territory and is stubbed to a
        // debug event).
        self.setup_repositories(&req.software, &saidata);

        // Step 4: enumerate providers, filtered by CanExecute (spec §4.3
        // step 2 + §9 Design Notes: "both filters ... preserve both").
        let mut candidates: Vec<Arc<Provider>> = self
            .deps
            .providers
            .available_for_action(&req.action)
            .into_iter()
            .filter(|p| {
                sai_executor::can_execute(p.as_ref(), &req.action, &req.software, &saidata)
            })
            .collect();
        if candidates.is_empty() {
            return self
                .fail(
                    &req,
                    start,
                    "multiple",
                    SaiError::new(ErrorKind::NoProvider, "no provider can execute this action"),
                )
                .await;
        }
        ProviderRegistry::rank(&mut candidates, &self.deps.config.provider_priority);

        // Step 5: select provider(s).
        let forced = req.provider.is_some();
        let selected: Vec<Arc<Provider>> = if let Some(name) = &req.provider {
            match candidates.iter().find(|p| &p.name == name) {
                Some(p) => vec![p.clone()],
                None => {
                    return self
                        .fail(
                            &req,
                            start,
                            "multiple",
                            SaiError::new(
                                ErrorKind::PreferredProviderUnavailable,
                                format!("provider '{name}' is not available for this action"),
                            ),
                        )
                        .await
                }
            }
        } else if INFORMATION_ONLY_ACTIONS.contains(&req.action.as_str())
            && candidates.len() > 1
            && !forced
        {
            return self.execute_across_all(&req, &candidates, &saidata, start).await;
        } else if candidates.len() == 1 || req.yes {
            vec![candidates[0].clone()]
        } else {
            let previews: Vec<ProviderPreview> = candidates
                .iter()
                .map(|p| ProviderPreview {
                    provider: p.name.clone(),
                    commands: dry_render(p.as_ref(), &req, &saidata),
                })
                .collect();
            match confirmer.select_provider(&req.action, &req.software, &previews) {
                Some(name) => match candidates.iter().find(|p| p.name == name) {
                    Some(p) => vec![p.clone()],
                    None => {
                        return self
                            .fail(
                                &req,
                                start,
                                "multiple",
                                SaiError::new(
                                    ErrorKind::PreferredProviderUnavailable,
                                    format!("'{name}' is not one of the offered candidates"),
                                ),
                            )
                            .await
                    }
                },
                None => return cancelled_result(&req, start),
            }
        };

        let provider = &selected[0];
        self.run_single(&req, provider, &candidates, &saidata, confirmer, start)
            .await
    }

    fn setup_repositories(&self, software: &str, saidata: &Saidata) {
        for (provider_name, over) in &saidata.providers {
            if !self.deps.providers.is_available(provider_name) {
                continue;
            }
            for repo in &over.repositories {
                if repo.enabled {
                    tracing::debug!(
                        software,
                        provider = provider_name.as_str(),
                        repository = repo.name.as_str(),
                        url = repo.url.as_str(),
                        "repository setup (stub: OS-level registration is provider-plugin territory)"
                    );
                }
            }
        }
    }

    /// Steps 6-9 for a single chosen provider.
    async fn run_single(
        &self,
        req: &ExecuteRequest,
        provider: &Arc<Provider>,
        candidates: &[Arc<Provider>],
        saidata: &Saidata,
        confirmer: &dyn Confirmer,
        start: Instant,
    ) -> ActionResult {
        // Step 6: safety.
        let safety = self.evaluate_safety(req, provider.as_ref(), saidata);
        if !safety.safe {
            let message = safety.error_messages().join("; ");
            return self
                .fail(
                    req,
                    start,
                    &provider.name,
                    SaiError::new(ErrorKind::SafetyFailed, message),
                )
                .await;
        }

        // Step 7: confirmation.
        let system_changing = SYSTEM_CHANGING_ACTIONS.contains(&req.action.as_str());
        let destructive = DESTRUCTIVE_ACTIONS.contains(&req.action.as_str());
        let bypassed = req.yes || req.dry_run;
        if system_changing && !bypassed {
            let commands = dry_render(provider.as_ref(), req, saidata);
            let ctx = ConfirmContext {
                action: &req.action,
                software: &req.software,
                provider: &provider.name,
                commands: &commands,
                destructive,
            };
            if !confirmer.confirm(&ctx) {
                return cancelled_result(req, start);
            }
        }

        // Step 8: execute, behind the circuit breaker and (for
        // system-changing actions) the mutation gate, then recovery.
        let _mutation_guard = if system_changing {
            Some(self.mutation_gate.lock().await)
        } else {
            None
        };

        let opts = ExecutionOptions {
            timeout: req
                .timeout
                .unwrap_or_else(|| Duration::from_secs(self.deps.config.timeout)),
            sudo_wrapper: sudo_wrapper_for(&self.deps.config),
            cancellation: CancellationToken::new(),
        };

        let mut result = if req.dry_run {
            sai_executor::dry_run(provider, &req.action, &req.software, saidata, &req.variables)
        } else {
            let key = breaker_key(&provider.name, &req.action);
            let breaker = self.breaker_for(&key).await;
            let provider = provider.clone();
            let action = req.action.clone();
            let software = req.software.clone();
            let variables = req.variables.clone();
            let saidata_for_call = saidata.clone();
            let opts_for_call = opts.clone();
            let outcome = breaker
                .call(&key, || async move {
                    let r = sai_executor::execute(
                        &provider,
                        &action,
                        &software,
                        &saidata_for_call,
                        &variables,
                        &opts_for_call,
                    )
                    .await;
                    to_breaker_outcome(&provider, &action, r)
                })
                .await;

            match outcome {
                Ok(result) => result,
                Err(error) => {
                    self.record_error(&error).await;
                    match self
                        .try_recover(req, provider, candidates, saidata, &error, &opts)
                        .await
                    {
                        Some(recovered) => recovered,
                        None => {
                            let mut failed = ActionResult::failed(
                                &req.action,
                                &req.software,
                                &provider.name,
                                error.to_string(),
                            );
                            failed.exit_code = error.exit_code();
                            failed
                        }
                    }
                }
            }
        };

        result.required_confirmation = system_changing && !bypassed;
        result.duration = start.elapsed();
        result
    }

    fn evaluate_safety(
        &self,
        req: &ExecuteRequest,
        provider: &Provider,
        saidata: &Saidata,
    ) -> sai_core::SafetyResult {
        let ctx = EvaluationContext {
            action: &req.action,
            software: &req.software,
            provider,
            saidata,
            provider_available: self.deps.providers.is_available(&provider.name),
            variables: &req.variables,
        };
        sai_safety::evaluate(&ctx)
    }

    /// Recovery strategies, tried in order, bounded by `max_attempts` with
    /// exponential backoff (spec §4.8). Only runs for errors tagged
    /// recoverable by the executor (`ExecutionFailed` when
    /// idempotent/retriable, `ActionTimeout` when idempotent).
    async fn try_recover(
        &self,
        req: &ExecuteRequest,
        provider: &Arc<Provider>,
        candidates: &[Arc<Provider>],
        saidata: &Saidata,
        error: &SaiError,
        opts: &ExecutionOptions,
    ) -> Option<ActionResult> {
        let max_attempts = self
            .deps
            .config
            .recovery
            .max_attempts
            .unwrap_or(sai_executor::DEFAULT_MAX_ATTEMPTS);

        let outcome = recover(error, max_attempts, |strategy, _attempt| {
            let req = req.clone();
            let provider = provider.clone();
            let candidates = candidates.to_vec();
            let saidata = saidata.clone();
            let opts = opts.clone();
            async move {
                match strategy {
                    RecoveryStrategy::Retry => Some(
                        sai_executor::execute(
                            &provider,
                            &req.action,
                            &req.software,
                            &saidata,
                            &req.variables,
                            &opts,
                        )
                        .await,
                    ),
                    RecoveryStrategy::AlternateProvider => {
                        let alternate = candidates.iter().find(|p| p.name != provider.name)?;
                        Some(
                            sai_executor::execute(
                                alternate,
                                &req.action,
                                &req.software,
                                &saidata,
                                &req.variables,
                                &opts,
                            )
                            .await,
                        )
                    }
                    RecoveryStrategy::RefreshSaidata => {
                        self.deps.saidata.invalidate(&req.software);
                        let refreshed = self.deps.saidata.resolve(&req.software).ok()?;
                        Some(
                            sai_executor::execute(
                                &provider,
                                &req.action,
                                &req.software,
                                &refreshed,
                                &req.variables,
                                &opts,
                            )
                            .await,
                        )
                    }
                    // No per-step "optional" metadata exists on `Step` in
                    // this model; this strategy is never applicable here.
                    RecoveryStrategy::SkipOptionalStep => None,
                }
            }
        })
        .await;

        outcome.map(|o| {
            let mut result = o.result;
            result.recovered_via = Some(o.strategy.to_string());
            result
        })
    }

    /// Execute-across-all-providers mode (spec §4.9): steps 6-9
    /// independently per candidate, combined into one aggregate result with
    /// `provider="multiple"`.
    async fn execute_across_all(
        &self,
        req: &ExecuteRequest,
        candidates: &[Arc<Provider>],
        saidata: &Saidata,
        start: Instant,
    ) -> ActionResult {
        let auto = AutoConfirm;
        let mut combined_output = String::new();
        let mut commands = Vec::new();
        let mut all_success = true;
        let mut any_nonzero = false;
        let mut changes = Vec::new();

        for provider in candidates {
            let per_provider = self
                .run_single(req, provider, candidates, saidata, &auto, Instant::now())
                .await;
            combined_output.push_str(&format!(
                "=== {} ===\n{}\n",
                provider.name, per_provider.output
            ));
            commands.extend(per_provider.commands);
            changes.extend(per_provider.changes);
            all_success &= per_provider.success;
            any_nonzero |= per_provider.exit_code != 0;
        }

        ActionResult {
            action: req.action.clone(),
            software: req.software.clone(),
            provider: "multiple".to_string(),
            success: all_success,
            error: if all_success {
                None
            } else {
                Some("one or more providers failed".to_string())
            },
            output: combined_output,
            commands,
            exit_code: if any_nonzero { 1 } else { 0 },
            duration: start.elapsed(),
            required_confirmation: false,
            changes,
            recovered_via: None,
        }
    }

    async fn fail(
        &self,
        req: &ExecuteRequest,
        start: Instant,
        provider: &str,
        error: SaiError,
    ) -> ActionResult {
        self.record_error(&error).await;
        let mut result = ActionResult::failed(&req.action, &req.software, provider, error.to_string());
        result.exit_code = error.exit_code();
        result.duration = start.elapsed();
        result
    }
}

fn cancelled_result(req: &ExecuteRequest, start: Instant) -> ActionResult {
    let mut result = ActionResult::failed(&req.action, &req.software, "multiple", "cancelled by user");
    result.exit_code = ErrorKind::Cancelled.exit_code();
    result.duration = start.elapsed();
    result
}

fn sudo_wrapper_for(config: &Config) -> Option<String> {
    let _ = config;
    // Discovering a real `sudo`/`doas` wrapper is a host-policy decision the
    // CLI layer makes (it may read a config field or probe `command_exists`);
    // orchestrator only forwards whatever it is told.
    None
}

fn dry_render(provider: &Provider, req: &ExecuteRequest, saidata: &Saidata) -> Vec<String> {
    sai_executor::dry_run(provider, &req.action, &req.software, saidata, &req.variables).commands
}

fn to_breaker_outcome(
    provider: &Provider,
    action: &str,
    result: ActionResult,
) -> sai_core::Result<ActionResult> {
    if result.success {
        return Ok(result);
    }
    let declared = provider.actions.get(action);
    let recoverable = declared.map(|a| a.idempotent || a.retriable).unwrap_or(false);
    let kind = if result.error.as_deref().unwrap_or_default().contains("exceeded") {
        ErrorKind::ActionTimeout
    } else {
        ErrorKind::ExecutionFailed
    };
    let recoverable = recoverable
        && (kind == ErrorKind::ExecutionFailed
            || declared.map(|a| a.idempotent).unwrap_or(false));
    Err(SaiError::new(kind, result.error.clone().unwrap_or_default()).recoverable(recoverable))
}

fn clone_error(e: &SaiError) -> SaiError {
    SaiError {
        kind: e.kind,
        message: e.message.clone(),
        cause: None,
        context: e.context.clone(),
        suggestions: e.suggestions.clone(),
        recoverable: e.recoverable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::{Action, Provider as CoreProvider, ProviderType};
    use std::collections::BTreeSet;

    fn provider(name: &str, priority: i32, template: &str) -> CoreProvider {
        let mut actions = HashMap::new();
        actions.insert("install".to_string(), Action::new_template(template));
        actions.insert(
            "uninstall".to_string(),
            Action::new_template("echo removing {{sai_package}}"),
        );
        actions.insert("info".to_string(), Action::new_template("echo info {{sai_package}}"));
        CoreProvider {
            name: name.to_string(),
            display_name: name.to_string(),
            provider_type: ProviderType::PackageManager,
            platforms: BTreeSet::new(),
            executable: Some("sh".to_string()),
            priority,
            capabilities: BTreeSet::new(),
            actions,
        }
    }

    fn registry_with(providers: Vec<CoreProvider>) -> (tempfile::TempDir, Arc<ProviderRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        for p in &providers {
            let yaml = serde_yaml::to_string(p).unwrap();
            std::fs::write(dir.path().join(format!("{}.yaml", p.name)), yaml).unwrap();
        }
        let (registry, _) = ProviderRegistry::load(dir.path());
        (dir, Arc::new(registry))
    }

    fn orchestrator_with(
        providers: Vec<CoreProvider>,
        saidata_root: &std::path::Path,
    ) -> (tempfile::TempDir, ActionOrchestrator) {
        let (dir, registry) = registry_with(providers);
        let saidata = Arc::new(SaidataStore::new(saidata_root));
        let orchestrator = ActionOrchestrator::new(OrchestratorDeps {
            providers: registry,
            saidata,
            config: Config::default(),
        });
        (dir, orchestrator)
    }

    #[tokio::test]
    async fn single_provider_install_runs_and_succeeds() {
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) = orchestrator_with(
            vec![provider("apt", 50, "echo apt-get install -y {{sai_package}}")],
            saidata_root.path(),
        );
        let mut req = ExecuteRequest::new("install", "nginx");
        req.yes = true;
        let result = orchestrator.execute_action(req, &AutoConfirm).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.provider, "apt");
        assert!(result.output.contains("apt-get install -y nginx"));
    }

    #[tokio::test]
    async fn unknown_action_is_action_not_supported() {
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) =
            orchestrator_with(vec![provider("apt", 50, "echo x")], saidata_root.path());
        let req = ExecuteRequest::new("frobnicate", "nginx");
        let result = orchestrator.execute_action(req, &AutoConfirm).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn preferred_provider_not_in_candidates_is_refused() {
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) =
            orchestrator_with(vec![provider("apt", 50, "echo x")], saidata_root.path());
        let mut req = ExecuteRequest::new("install", "nginx");
        req.provider = Some("brew".to_string());
        let result = orchestrator.execute_action(req, &AutoConfirm).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("brew"));
    }

    #[tokio::test]
    async fn uninstalling_critical_software_is_safety_blocked() {
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) =
            orchestrator_with(vec![provider("apt", 50, "echo x")], saidata_root.path());
        let mut req = ExecuteRequest::new("uninstall", "systemd");
        req.yes = true;
        let result = orchestrator.execute_action(req, &AutoConfirm).await;
        assert!(!result.success);
        assert!(result.error.unwrap().to_lowercase().contains("critical"));
    }

    #[tokio::test]
    async fn info_fans_out_across_all_available_providers() {
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) = orchestrator_with(
            vec![
                provider("apt", 50, "echo x"),
                provider("brew", 40, "echo y"),
            ],
            saidata_root.path(),
        );
        let req = ExecuteRequest::new("info", "nginx");
        let result = orchestrator.execute_action(req, &AutoConfirm).await;
        assert_eq!(result.provider, "multiple");
        assert!(result.output.contains("apt"));
        assert!(result.output.contains("brew"));
    }

    #[tokio::test]
    async fn refusing_confirmation_cancels_without_executing() {
        struct Refuse;
        impl Confirmer for Refuse {
            fn select_provider(&self, _: &str, _: &str, c: &[ProviderPreview]) -> Option<String> {
                c.first().map(|p| p.provider.clone())
            }
            fn confirm(&self, _ctx: &ConfirmContext) -> bool {
                false
            }
        }
        let saidata_root = tempfile::tempdir().unwrap();
        let (_dir, orchestrator) =
            orchestrator_with(vec![provider("apt", 50, "echo x")], saidata_root.path());
        let req = ExecuteRequest::new("install", "nginx");
        let result = orchestrator.execute_action(req, &Refuse).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 130);
    }
}
