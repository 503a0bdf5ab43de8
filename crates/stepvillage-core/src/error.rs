//! Error types for the session engine.
//!
//! Nothing here is fatal to a player: callers either ignore a rejected
//! action or fall back to local data.

use stepvillage_logic::config::ConfigError;

use crate::capabilities::SessionKind;

/// A quiz catalog could not be built.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("quiz catalog is empty")]
    Empty,
    #[error("duplicate quiz id '{0}'")]
    DuplicateId(String),
    #[error("quiz '{0}' has an empty prompt")]
    EmptyPrompt(String),
    #[error("quiz '{id}': correct choice '{choice}' is not one of its choices")]
    UnknownCorrectChoice { id: String, choice: String },
    #[error("invalid quiz catalog payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A remote collaborator failed; callers substitute local data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote service unavailable: {0}")]
    Unavailable(String),
    #[error("remote service timed out")]
    Timeout,
    #[error("remote service returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// A session action was rejected. Session state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{session:?} session cannot {action} while {phase}")]
    InvalidTransition {
        session: SessionKind,
        action: &'static str,
        phase: &'static str,
    },
    #[error("café session needs at least one round")]
    NoRounds,
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ConfigError>),
}

/// The engine could not be assembled.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
