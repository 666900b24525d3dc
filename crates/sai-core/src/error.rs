//! Error taxonomy for sai (spec §7).
//!
//! Every public operation across the workspace returns [`SaiError`]. The
//! `kind` distinguishes the taxonomy class; `recoverable` records whether
//! the circuit breaker / retry machinery (sai-executor) may act on it.

use std::fmt;
use thiserror::Error;

/// Semantic error classes from the error handling design (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    ConfigInvalid,
    ProviderSchemaInvalid,
    SaidataSchemaInvalid,
    YamlParse,
    ActionNotSupported,
    NoProvider,
    PreferredProviderUnavailable,
    TemplateResolution,
    SafetyFailed,
    PermissionDenied,
    ExecutionFailed,
    ActionTimeout,
    CircuitOpen,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Exit-code convention: `Cancelled` maps to 130, everything else to a
    /// generic non-zero failure (spec §7, §6 exit-code policy).
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Cancelled => 130,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::ProviderSchemaInvalid => "ProviderSchemaInvalid",
            ErrorKind::SaidataSchemaInvalid => "SaidataSchemaInvalid",
            ErrorKind::YamlParse => "YAMLParse",
            ErrorKind::ActionNotSupported => "ActionNotSupported",
            ErrorKind::NoProvider => "NoProvider",
            ErrorKind::PreferredProviderUnavailable => "PreferredProviderUnavailable",
            ErrorKind::TemplateResolution => "TemplateResolution",
            ErrorKind::SafetyFailed => "SafetyFailed",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::ExecutionFailed => "ExecutionFailed",
            ErrorKind::ActionTimeout => "ActionTimeout",
            ErrorKind::CircuitOpen => "CircuitOpen",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Internal => "Internal",
        };
        write!(f, "{s}")
    }
}

/// Typed error carrying kind, message, cause, context key-values and
/// suggestions, per the propagation policy in spec §7.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct SaiError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    pub context: Vec<(String, String)>,
    pub suggestions: Vec<String>,
    /// Whether recovery (sai-executor's CircuitBreaker/Recovery) may act on
    /// this error. Only `ExecutionFailed` (when the action is `idempotent`
    /// or `retriable`) and `ActionTimeout` (when `idempotent`) are ever
    /// recoverable; every other kind is fixed non-recoverable.
    pub recoverable: bool,
}

impl SaiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            context: Vec::new(),
            suggestions: Vec::new(),
            recoverable: false,
        }
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn recoverable(mut self, yes: bool) -> Self {
        self.recoverable = yes;
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

pub type Result<T> = std::result::Result<T, SaiError>;

impl From<std::io::Error> for SaiError {
    fn from(err: std::io::Error) -> Self {
        SaiError::new(ErrorKind::Internal, err.to_string()).with_cause(err)
    }
}
