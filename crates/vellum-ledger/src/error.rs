use thiserror::Error;
use vellum_core::{EntityAddress, StateVersion};
use vellum_store::StoreError;

/// Errors raised while extending the ledger.
///
/// Storage failures are transient: the caller may retry the same batch once
/// the store recovers, since nothing is committed until the final atomic
/// write. Every other variant is a feed-contract violation and retrying the
/// same batch will fail the same way.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("batch processing cancelled")]
    Cancelled,

    #[error("empty batch")]
    EmptyBatch,

    #[error("batch is not monotonic: {current} follows {previous}")]
    NonMonotonicBatch {
        previous: StateVersion,
        current: StateVersion,
    },

    #[error("batch starts at {first} but the ledger is already at {top}")]
    BatchBehindTopOfLedger {
        top: StateVersion,
        first: StateVersion,
    },

    #[error("batch starts at {first}, expected {} after top of ledger {top}", top.next())]
    BatchNotContiguous {
        top: StateVersion,
        first: StateVersion,
    },

    #[error(
        "out-of-order observation for {subject}: version {observed} is behind materialized version {materialized}"
    )]
    OutOfOrderObservation {
        subject: String,
        observed: StateVersion,
        materialized: StateVersion,
    },

    #[error("entity not found: {0}")]
    MissingEntity(EntityAddress),

    #[error("entity {address} is a {actual}, expected a {expected}")]
    EntityTypeMismatch {
        address: EntityAddress,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("vault {0} is missing its owner or resource link")]
    IncompleteVault(EntityAddress),

    #[error("entity declared more than once: {0}")]
    DuplicateEntity(EntityAddress),
}

impl LedgerError {
    /// Whether retrying the same batch can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Store(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
