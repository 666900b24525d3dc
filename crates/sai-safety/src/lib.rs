//! SafetyEvaluator (spec §4.6): composite pre-flight check producing a
//! `SafetyResult`. Five checks run in order; a message is classified
//! "warning" vs "error" by the presence of the substring "warning"
//! (case-insensitive) — preserved verbatim as the aggregation rule.

use std::collections::HashMap;

use sai_core::{Provider, Result as SaiResult, SafetyCheck, SafetyResult, Saidata};

/// Actions that create the resources they reference — resource existence
/// is therefore not yet meaningful and is skipped entirely.
const RESOURCE_CREATING_ACTIONS: &[&str] = &["install", "upgrade", "search", "info", "version"];

const DESTRUCTIVE_ACTIONS: &[&str] = &["uninstall", "stop", "disable"];

/// Software whose removal is treated as catastrophic regardless of
/// provider (spec §4.6 check 3).
const CRITICAL_SOFTWARE: &[&str] = &["systemd", "kernel", "glibc", "bash", "ssh"];

pub struct EvaluationContext<'a> {
    pub action: &'a str,
    pub software: &'a str,
    pub provider: &'a Provider,
    pub saidata: &'a Saidata,
    pub provider_available: bool,
    pub variables: &'a HashMap<String, String>,
}

pub fn evaluate(ctx: &EvaluationContext) -> SafetyResult {
    let mut checks = Vec::new();

    checks.push(check_resource_existence(ctx));
    checks.push(check_provider_availability(ctx));
    checks.push(check_destructive_operation(ctx));
    checks.push(check_system_requirements(ctx));
    checks.push(check_template_resolution(ctx));

    SafetyResult::from_checks(ctx.action, ctx.software, &ctx.provider.name, checks)
}

fn check_resource_existence(ctx: &EvaluationContext) -> SafetyCheck {
    let name = "resource_existence";
    if RESOURCE_CREATING_ACTIONS.contains(&ctx.action) {
        return SafetyCheck {
            name: name.to_string(),
            passed: true,
            messages: vec!["skipped: action creates its own resources".to_string()],
        };
    }

    let mut messages = Vec::new();
    let strict = ctx
        .provider
        .actions
        .get(ctx.action)
        .map(|a| a.requires_strict)
        .unwrap_or(false);

    for command in &ctx.saidata.resources.commands {
        if !sai_probe::command_exists(&command.path) {
            messages.push(format!(
                "error: command '{}' ({}) is not present on this host",
                command.name, command.path
            ));
        }
    }
    for file in &ctx.saidata.resources.files {
        if !sai_probe::file_exists(&file.path) {
            let severity = if strict { "error" } else { "warning" };
            messages.push(format!(
                "{severity}: file '{}' ({}) is not present on this host",
                file.name, file.path
            ));
        }
    }
    for directory in &ctx.saidata.resources.directories {
        if !sai_probe::dir_exists(&directory.path) {
            let severity = if strict { "error" } else { "warning" };
            messages.push(format!(
                "{severity}: directory '{}' ({}) is not present on this host",
                directory.name, directory.path
            ));
        }
    }
    for service in &ctx.saidata.resources.services {
        let service_type = service
            .service_type
            .map(probe_service_type)
            .unwrap_or(sai_probe::ServiceType::Unknown);
        let probe_name = if service.service_name.is_empty() {
            &service.name
        } else {
            &service.service_name
        };
        if !sai_probe::service_exists(probe_name, service_type) {
            let severity = if strict { "error" } else { "warning" };
            messages.push(format!(
                "{severity}: service '{}' is not registered with the host service manager",
                service.name
            ));
        }
    }

    let passed = !messages.iter().any(|m| !SafetyCheck::is_warning_message(m));
    SafetyCheck {
        name: name.to_string(),
        passed,
        messages,
    }
}

fn probe_service_type(t: sai_core::ServiceType) -> sai_probe::ServiceType {
    match t {
        sai_core::ServiceType::Systemd => sai_probe::ServiceType::Systemd,
        sai_core::ServiceType::Launchd => sai_probe::ServiceType::Launchd,
        sai_core::ServiceType::WindowsService => sai_probe::ServiceType::WindowsService,
        sai_core::ServiceType::Unknown => sai_probe::ServiceType::Unknown,
    }
}

fn check_provider_availability(ctx: &EvaluationContext) -> SafetyCheck {
    let messages = if ctx.provider_available {
        Vec::new()
    } else {
        vec![format!(
            "error: provider '{}' is no longer available",
            ctx.provider.name
        )]
    };
    SafetyCheck {
        name: "provider_availability".to_string(),
        passed: ctx.provider_available,
        messages,
    }
}

fn check_destructive_operation(ctx: &EvaluationContext) -> SafetyCheck {
    let mut messages = Vec::new();
    if DESTRUCTIVE_ACTIONS.contains(&ctx.action) {
        messages.push(format!(
            "warning: '{}' is a destructive operation on '{}'",
            ctx.action, ctx.software
        ));
        if ctx.action == "uninstall" && CRITICAL_SOFTWARE.contains(&ctx.software) {
            messages.push(format!(
                "error: '{}' is critical system software and must not be uninstalled",
                ctx.software
            ));
        }
    }
    let passed = !messages.iter().any(|m| !SafetyCheck::is_warning_message(m));
    SafetyCheck {
        name: "destructive_operation".to_string(),
        passed,
        messages,
    }
}

fn check_system_requirements(ctx: &EvaluationContext) -> SafetyCheck {
    let mut messages = Vec::new();
    let requirements = &ctx.saidata.requirements;
    if let Some(mb) = requirements.memory_mb {
        messages.push(format!("info: declares a minimum of {mb} MB memory"));
    }
    if let Some(mb) = requirements.disk_mb {
        messages.push(format!("info: declares a minimum of {mb} MB disk"));
    }
    if let Some(v) = &requirements.java_version {
        messages.push(format!("info: declares a minimum Java version {v}"));
    }
    // Host measurement is out of scope (spec §4.6 check 4): this check
    // never fails regardless of content.
    SafetyCheck {
        name: "system_requirements".to_string(),
        passed: true,
        messages,
    }
}

fn check_template_resolution(ctx: &EvaluationContext) -> SafetyCheck {
    let name = "template_resolution";
    let Some(action) = ctx.provider.actions.get(ctx.action) else {
        return SafetyCheck {
            name: name.to_string(),
            passed: false,
            messages: vec![format!(
                "error: action '{}' is not declared on provider '{}'",
                ctx.action, ctx.provider.name
            )],
        };
    };

    let render_ctx = sai_template::Context {
        saidata: ctx.saidata,
        provider_name: &ctx.provider.name,
        variables: ctx.variables,
        software: ctx.software,
        safety_mode: true,
    };

    let render_result: SaiResult<()> = if let Some(template) = action.template() {
        sai_template::render(template, &render_ctx).map(|_| ())
    } else if let Some(steps) = action.steps() {
        let commands: Vec<&str> = steps.iter().map(|s| s.command.as_str()).collect();
        sai_template::render_steps(&commands, &render_ctx).map(|_| ())
    } else {
        Ok(())
    };

    match render_result {
        Ok(()) => SafetyCheck {
            name: name.to_string(),
            passed: true,
            messages: Vec::new(),
        },
        Err(e) => SafetyCheck {
            name: name.to_string(),
            passed: false,
            messages: vec![format!("error: {e}")],
        },
    }
}
