//! ActionOrchestrator (spec §4.9): the top-level workflow that ties
//! together saidata resolution, provider selection, safety evaluation,
//! confirmation, execution, circuit-breaking and recovery, plus the
//! apply-file batch driver.

pub mod apply;
pub mod orchestrator;

pub use apply::{run_apply_file, ApplyFile, ApplyOutcome};
pub use orchestrator::{
    ActionOrchestrator, AutoConfirm, ConfirmContext, Confirmer, ExecuteRequest, OrchestratorDeps,
    ProviderPreview, INFORMATION_ONLY_ACTIONS, SYSTEM_CHANGING_ACTIONS,
};
