//! The `Confirmer` collaborator sai-orchestrator prompts through (spec
//! §4.9 steps 5 & 7): a `dialoguer`-backed console implementation,
//! gated by the config's per-action-class `confirmations` toggles
//! (spec §6 "Configuration file").

use sai_config::Config;
use sai_orchestrator::{ConfirmContext, Confirmer, ProviderPreview};

use crate::ui::Ui;

pub struct ConsolePrompt {
    config: Config,
}

impl ConsolePrompt {
    pub fn new(config: Config) -> Self {
        ConsolePrompt { config }
    }

    /// Whether this action class is configured to require confirmation at
    /// all; an operator may turn individual classes off (e.g.
    /// `confirmations.info_commands: false`, the default).
    fn requires_confirmation(&self, action: &str, destructive: bool) -> bool {
        let c = &self.config.confirmations;
        match action {
            "install" => c.install,
            "uninstall" => c.uninstall,
            "upgrade" => c.upgrade,
            "start" | "stop" | "restart" | "enable" | "disable" => c.service_ops,
            "search" | "info" | "version" | "status" | "logs" | "config" | "check" | "cpu"
            | "memory" | "io" | "list" | "stats" => c.info_commands,
            _ => destructive || c.system_changes,
        }
    }
}

impl Confirmer for ConsolePrompt {
    fn select_provider(
        &self,
        action: &str,
        software: &str,
        candidates: &[ProviderPreview],
    ) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        Ui::info(&format!("multiple providers can run '{action}' for '{software}':"));
        let labels: Vec<String> = candidates
            .iter()
            .map(|c| format!("{} ({})", c.provider, c.commands.join(" && ")))
            .collect();
        let index = Ui::select("select a provider", &labels)?;
        candidates.get(index).map(|c| c.provider.clone())
    }

    fn confirm(&self, ctx: &ConfirmContext) -> bool {
        if !self.requires_confirmation(ctx.action, ctx.destructive) {
            return true;
        }
        for command in ctx.commands {
            Ui::command(command);
        }
        let prompt = if ctx.destructive {
            format!(
                "DESTRUCTIVE: {} '{}' via {} — proceed?",
                ctx.action, ctx.software, ctx.provider
            )
        } else {
            format!("{} '{}' via {} — proceed?", ctx.action, ctx.software, ctx.provider)
        };
        Ui::confirm(&prompt, !ctx.destructive)
    }
}
