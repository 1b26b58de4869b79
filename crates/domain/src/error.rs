//! Typed roll errors.
//!
//! Every precondition violation is raised from `before_roll` before any die is
//! drawn. Callers surface [`RollError::to_string`] inline and keep the roll flow
//! alive; [`RollErrorPayload`] is the `{code, message}` wire shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised by a ruleset while preparing a roll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollError {
    /// The acting character cannot act at all
    #[error("{character_name} is incapacitated and cannot roll")]
    Incapacitated { character_name: String },

    /// The declared mode needs more of a spendable resource than is available
    #[error("Not enough {resource} for {mode}: need {needed}, have {available}")]
    InsufficientResource {
        resource: String,
        mode: String,
        needed: u32,
        available: u32,
    },

    /// Resolved roll parameters are unusable (empty pool, empty explosion set, ...)
    #[error("Invalid roll parameters: {0}")]
    InvalidParams(String),

    /// Ruleset-specific data could not be recovered from a stored roll
    #[error("Invalid ruleset data: {0}")]
    InvalidSystemData(String),
}

impl RollError {
    pub fn incapacitated(character_name: impl Into<String>) -> Self {
        Self::Incapacitated {
            character_name: character_name.into(),
        }
    }

    pub fn insufficient_resource(
        resource: impl Into<String>,
        mode: impl Into<String>,
        needed: u32,
        available: u32,
    ) -> Self {
        Self::InsufficientResource {
            resource: resource.into(),
            mode: mode.into(),
            needed,
            available,
        }
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Incapacitated { .. } => "incapacitated",
            Self::InsufficientResource { .. } => "insufficient_resource",
            Self::InvalidParams(_) => "invalid_params",
            Self::InvalidSystemData(_) => "invalid_system_data",
        }
    }

    pub fn to_payload(&self) -> RollErrorPayload {
        RollErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Wire shape of a [`RollError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&RollError> for RollErrorPayload {
    fn from(err: &RollError) -> Self {
        err.to_payload()
    }
}
