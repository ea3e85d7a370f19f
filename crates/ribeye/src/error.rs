//! Error taxonomy for slots, storage and the cooking process.

use chrono::{DateTime, Utc};

use crate::process::Step;
use crate::resource::{ResourceKind, Unit};

/// Failures raised by a single slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot is empty")]
    Empty,
    #[error("slot is full")]
    Full,
    #[error("slot is inactive")]
    InactiveSlot,
    #[error("slot holds {expected} quantities, requested in {actual}")]
    UnitMismatch { expected: Unit, actual: Unit },
}

/// Failures surfaced through the repository contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("resource {0} not found")]
    NotFound(ResourceKind),
    #[error("{0} slot is empty")]
    Empty(ResourceKind),
    #[error("{0} slot is full")]
    Full(ResourceKind),
    #[error("{kind} has expired at {expiration}")]
    RottenResource {
        kind: ResourceKind,
        expiration: DateTime<Utc>,
    },
    #[error("exhausted {attempts} retries for {kind} slot")]
    ExhaustedRetries { kind: ResourceKind, attempts: u32 },
    #[error("{kind} is stored by {expected}, requested by {actual}")]
    UnitMismatch {
        kind: ResourceKind,
        expected: Unit,
        actual: Unit,
    },
}

impl StorageError {
    /// Translate a slot failure into the repository-level error for `kind`.
    ///
    /// An inactive slot means the pool being asked about no longer exists.
    pub(crate) fn from_slot(kind: ResourceKind, err: SlotError) -> Self {
        match err {
            SlotError::Empty => Self::Empty(kind),
            SlotError::Full => Self::Full(kind),
            SlotError::InactiveSlot => Self::NotFound(kind),
            SlotError::UnitMismatch { expected, actual } => Self::UnitMismatch {
                kind,
                expected,
                actual,
            },
        }
    }
}

/// Failures of the cooking process and its combinators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{step} rejected: {reason}")]
    Rejected { step: Step, reason: String },
    #[error("expected state after {expected}, got {actual}")]
    UnexpectedStep { expected: Step, actual: Step },
    #[error("branch cancelled")]
    Cancelled,
    #[error("branch panicked: {0}")]
    BranchPanicked(String),
}

impl ProcessError {
    pub fn rejected(step: Step, reason: impl Into<String>) -> Self {
        Self::Rejected {
            step,
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
