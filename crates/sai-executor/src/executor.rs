//! Executor (spec §4.7): renders a provider action into shell command(s)
//! and runs them, or previews them under `DryRun`.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use sai_core::{Action, ErrorKind, Provider, Result, SaiError, Saidata};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const RESOURCE_CREATING_ACTIONS: &[&str] = &["install", "upgrade", "search", "info", "version"];

/// Per-call knobs threaded down from the orchestrator/CLI.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Hard ceiling enforced on top of any per-step deadline (spec §4.7,
    /// default 30s).
    pub timeout: Duration,
    /// Command prepended when `action.requires_root` and the current
    /// process isn't already privileged — e.g. `"sudo"` or `"sudo -n"`.
    pub sudo_wrapper: Option<String>,
    pub cancellation: CancellationToken,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            timeout: Duration::from_secs(30),
            sudo_wrapper: None,
            cancellation: CancellationToken::new(),
        }
    }
}

fn render_context<'a>(
    saidata: &'a Saidata,
    provider_name: &'a str,
    variables: &'a HashMap<String, String>,
    software: &'a str,
) -> sai_template::Context<'a> {
    sai_template::Context {
        saidata,
        provider_name,
        variables,
        software,
        safety_mode: true,
    }
}

/// Render every command an action would run, without executing anything.
fn render_commands(
    action: &Action,
    provider_name: &str,
    software: &str,
    saidata: &Saidata,
    variables: &HashMap<String, String>,
) -> Result<Vec<String>> {
    let ctx = render_context(saidata, provider_name, variables, software);
    if let Some(template) = action.template() {
        Ok(vec![sai_template::render(template, &ctx)?])
    } else if let Some(steps) = action.steps() {
        let commands: Vec<&str> = steps.iter().map(|s| s.command.as_str()).collect();
        sai_template::render_steps(&commands, &ctx)
    } else {
        Ok(Vec::new())
    }
}

/// True iff the action exists, its template/steps render cleanly in
/// safety mode, and every command/file resource it names is present on
/// this host — unless the action belongs to the resource-creating set
/// (spec §4.7).
pub fn can_execute(
    provider: &Provider,
    action_name: &str,
    software: &str,
    saidata: &Saidata,
) -> bool {
    let Some(action) = provider.actions.get(action_name) else {
        return false;
    };
    let variables = HashMap::new();
    if render_commands(action, &provider.name, software, saidata, &variables).is_err() {
        return false;
    }
    if RESOURCE_CREATING_ACTIONS.contains(&action_name) {
        return true;
    }
    saidata
        .resources
        .commands
        .iter()
        .all(|c| sai_probe::command_exists(&c.path))
        && saidata.resources.files.iter().all(|f| sai_probe::file_exists(&f.path))
}

/// Render but never execute; returns a synthetic zero exit code.
pub fn dry_run(
    provider: &Provider,
    action_name: &str,
    software: &str,
    saidata: &Saidata,
    variables: &HashMap<String, String>,
) -> sai_core::ActionResult {
    let start = Instant::now();
    let action = match provider.actions.get(action_name) {
        Some(a) => a,
        None => {
            return failed_result(
                action_name,
                software,
                &provider.name,
                SaiError::new(ErrorKind::ActionNotSupported, "action not declared"),
                start,
            )
        }
    };
    match render_commands(action, &provider.name, software, saidata, variables) {
        Ok(commands) => sai_core::ActionResult {
            action: action_name.to_string(),
            software: software.to_string(),
            provider: provider.name.clone(),
            success: true,
            error: None,
            output: String::new(),
            commands,
            exit_code: 0,
            duration: start.elapsed(),
            required_confirmation: false,
            changes: Vec::new(),
            recovered_via: None,
        },
        Err(e) => failed_result(action_name, software, &provider.name, e, start),
    }
}

fn failed_result(
    action: &str,
    software: &str,
    provider: &str,
    error: SaiError,
    start: Instant,
) -> sai_core::ActionResult {
    let mut result = sai_core::ActionResult::failed(action, software, provider, error.to_string());
    result.exit_code = error.exit_code();
    result.duration = start.elapsed();
    result
}

/// Run the action for real: one invocation for `template`, a sequential
/// walk with per-step rollback for `steps`.
pub async fn execute(
    provider: &Provider,
    action_name: &str,
    software: &str,
    saidata: &Saidata,
    variables: &HashMap<String, String>,
    opts: &ExecutionOptions,
) -> sai_core::ActionResult {
    let start = Instant::now();
    let Some(action) = provider.actions.get(action_name) else {
        return failed_result(
            action_name,
            software,
            &provider.name,
            SaiError::new(ErrorKind::ActionNotSupported, "action not declared"),
            start,
        );
    };

    if action.requires_root && !running_as_root() {
        if opts.sudo_wrapper.is_none() {
            return failed_result(
                action_name,
                software,
                &provider.name,
                SaiError::new(
                    ErrorKind::PermissionDenied,
                    "action requires root and no privilege-elevation wrapper is configured",
                ),
                start,
            );
        }
    }

    let ctx = render_context(saidata, &provider.name, variables, software);

    if let Some(template) = action.template() {
        let command = match sai_template::render(template, &ctx) {
            Ok(c) => c,
            Err(e) => return failed_result(action_name, software, &provider.name, e, start),
        };
        let elevated = elevate(&command, action.requires_root, opts);
        return match run_one(&elevated, opts).await {
            Ok((output, exit_code)) => sai_core::ActionResult {
                action: action_name.to_string(),
                software: software.to_string(),
                provider: provider.name.clone(),
                success: exit_code == 0,
                error: if exit_code == 0 {
                    None
                } else {
                    Some(format!("command exited with status {exit_code}"))
                },
                output,
                commands: vec![command],
                exit_code,
                duration: start.elapsed(),
                required_confirmation: false,
                changes: Vec::new(),
                recovered_via: None,
            },
            Err(e) => failed_result(action_name, software, &provider.name, e, start),
        };
    }

    let Some(steps) = action.steps() else {
        return failed_result(
            action_name,
            software,
            &provider.name,
            SaiError::new(ErrorKind::ProviderSchemaInvalid, "action has neither template nor steps"),
            start,
        );
    };

    let mut commands_run = Vec::new();
    let mut combined_output = String::new();
    let mut final_exit = 0;
    let mut failure: Option<String> = None;

    for step in steps {
        let rendered = match sai_template::render(&step.command, &ctx) {
            Ok(c) => c,
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        };
        let elevated = elevate(&rendered, action.requires_root, opts);
        commands_run.push(rendered.clone());
        match run_one(&elevated, opts).await {
            Ok((output, exit_code)) => {
                combined_output.push_str(&format!("[{}] {}\n", step.name, output));
                if exit_code != 0 {
                    final_exit = exit_code;
                    failure = Some(format!("step '{}' exited with status {exit_code}", step.name));
                    if let Some(rollback) = &step.rollback {
                        if let Ok(rendered_rollback) = sai_template::render(rollback, &ctx) {
                            let elevated_rollback =
                                elevate(&rendered_rollback, action.requires_root, opts);
                            commands_run.push(rendered_rollback);
                            let _ = run_one(&elevated_rollback, opts).await;
                        }
                    }
                    if step.on_failure != sai_core::OnFailure::Continue {
                        break;
                    }
                    failure = None;
                }
            }
            Err(e) => {
                failure = Some(e.to_string());
                final_exit = 1;
                break;
            }
        }
    }

    sai_core::ActionResult {
        action: action_name.to_string(),
        software: software.to_string(),
        provider: provider.name.clone(),
        success: failure.is_none(),
        error: failure,
        output: combined_output,
        commands: commands_run,
        exit_code: final_exit,
        duration: start.elapsed(),
        required_confirmation: false,
        changes: Vec::new(),
        recovered_via: None,
    }
}

fn elevate(command: &str, requires_root: bool, opts: &ExecutionOptions) -> String {
    if requires_root && !running_as_root() {
        if let Some(wrapper) = &opts.sudo_wrapper {
            return format!("{wrapper} {command}");
        }
    }
    command.to_string()
}

#[cfg(unix)]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self")
        .map(|m| m.uid() == 0)
        .unwrap_or_else(|_| std::env::var("USER").map(|u| u == "root").unwrap_or(false))
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Invoke a single shell command line via `sh -c`, capturing combined
/// stdout+stderr, honoring both `opts.timeout` and cooperative
/// cancellation (spec §4.7, §5).
pub async fn run_one(cmdline: &str, opts: &ExecutionOptions) -> Result<(String, i32)> {
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    let flag = if cfg!(windows) { "/C" } else { "-c" };

    let mut child = Command::new(shell)
        .arg(flag)
        .arg(cmdline)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            SaiError::new(ErrorKind::ExecutionFailed, format!("failed to spawn '{cmdline}': {e}"))
                .with_context("command", cmdline.to_string())
        })?;

    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");

    let io = async {
        let mut out = String::new();
        let mut err = String::new();
        let _ = stdout.read_to_string(&mut out).await;
        let _ = stderr.read_to_string(&mut err).await;
        (out, err)
    };

    tokio::select! {
        _ = opts.cancellation.cancelled() => {
            let _ = child.start_kill();
            Err(SaiError::new(ErrorKind::Cancelled, "execution cancelled").recoverable(false))
        }
        result = tokio::time::timeout(opts.timeout, async {
            let (out, err) = io.await;
            let status = child.wait().await;
            (out, err, status)
        }) => {
            match result {
                Ok((out, err, Ok(status))) => {
                    let mut combined = out;
                    combined.push_str(&err);
                    Ok((combined, status.code().unwrap_or(-1)))
                }
                Ok((_, _, Err(e))) => Err(SaiError::new(
                    ErrorKind::ExecutionFailed,
                    format!("failed to wait on '{cmdline}': {e}"),
                )),
                Err(_) => {
                    Err(SaiError::new(ErrorKind::ActionTimeout, format!("'{cmdline}' exceeded {:?}", opts.timeout))
                        .recoverable(true))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sai_core::{Action, ProviderType};
    use std::collections::BTreeSet;

    fn provider_with(actions: HashMap<String, Action>) -> Provider {
        Provider {
            name: "shell".to_string(),
            display_name: String::new(),
            provider_type: ProviderType::PackageManager,
            platforms: BTreeSet::new(),
            executable: Some("sh".to_string()),
            priority: 0,
            capabilities: BTreeSet::new(),
            actions,
        }
    }

    #[tokio::test]
    async fn execute_single_template_runs_and_captures_output() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_template("echo hello-{{.Software}}"),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let opts = ExecutionOptions::default();
        let result = execute(&provider, "install", "world", &saidata, &vars, &opts).await;
        assert!(result.success);
        assert!(result.output.contains("hello-world"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn execute_reports_nonzero_exit_as_failure() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_template("exit 7"),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let opts = ExecutionOptions::default();
        let result = execute(&provider, "install", "x", &saidata, &vars, &opts).await;
        assert!(!result.success);
        assert_eq!(result.exit_code, 7);
    }

    #[tokio::test]
    async fn multi_step_stops_after_failing_step_by_default() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_steps(vec![
                sai_core::Step {
                    name: "one".to_string(),
                    command: "exit 1".to_string(),
                    rollback: None,
                    on_failure: sai_core::OnFailure::Stop,
                },
                sai_core::Step {
                    name: "two".to_string(),
                    command: "echo should-not-run".to_string(),
                    rollback: None,
                    on_failure: sai_core::OnFailure::Stop,
                },
            ]),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let opts = ExecutionOptions::default();
        let result = execute(&provider, "install", "x", &saidata, &vars, &opts).await;
        assert!(!result.success);
        assert_eq!(result.commands.len(), 1);
    }

    #[tokio::test]
    async fn multi_step_continues_when_on_failure_is_continue() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_steps(vec![
                sai_core::Step {
                    name: "one".to_string(),
                    command: "exit 1".to_string(),
                    rollback: None,
                    on_failure: sai_core::OnFailure::Continue,
                },
                sai_core::Step {
                    name: "two".to_string(),
                    command: "echo ran".to_string(),
                    rollback: None,
                    on_failure: sai_core::OnFailure::Stop,
                },
            ]),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let opts = ExecutionOptions::default();
        let result = execute(&provider, "install", "x", &saidata, &vars, &opts).await;
        assert!(result.success);
        assert_eq!(result.commands.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_never_executes_and_returns_zero_exit() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_template("apt-get install -y {{sai_package}}"),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let result = dry_run(&provider, "install", "nginx", &saidata, &vars);
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.commands, vec!["apt-get install -y nginx".to_string()]);
    }

    #[test]
    fn can_execute_false_for_unknown_action() {
        let provider = provider_with(HashMap::new());
        let saidata = Saidata::default();
        assert!(!can_execute(&provider, "install", "nginx", &saidata));
    }

    #[tokio::test]
    async fn execute_times_out_and_is_marked_recoverable() {
        let provider = provider_with(HashMap::from([(
            "install".to_string(),
            Action::new_template("sleep 5"),
        )]));
        let saidata = Saidata::default();
        let vars = HashMap::new();
        let mut opts = ExecutionOptions::default();
        opts.timeout = Duration::from_millis(50);
        let result = execute(&provider, "install", "x", &saidata, &vars, &opts).await;
        assert!(!result.success);
    }
}
