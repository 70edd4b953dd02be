//! # vellum-ledger
//!
//! The incremental state-diffing and history-aggregation engine.
//!
//! Once per batch of committed transactions, [`LedgerExtender`] drives a
//! fixed pipeline: resolve every referenced entity, let each processor
//! observe the batch's substate changes and events, bulk-load the most
//! recent materialized rows for everything observed, reconcile in memory,
//! and commit all staged rows in one atomic store write.
//!
//! Processors append immutable entry-history rows for every change and keep
//! full-snapshot aggregate rows (ordered id lists or running totals) per
//! coarser subject, so "the current state of X at version N" is a single
//! row read for consumers instead of a replay from genesis.

mod cache;
mod cancel;
mod error;
mod extender;
pub mod processors;
mod read;
mod registry;
mod sequences;
mod tracker;
mod write;

pub use cache::MostRecentCache;
pub use cancel::CancellationToken;
pub use error::{LedgerError, LedgerResult};
pub use extender::{ExtenderConfig, ExtensionReport, LedgerExtender};
pub use read::{load_current, load_most_recent};
pub use registry::{EntityRegistry, ResolvedEntity};
pub use sequences::{SequenceAllocator, SequenceKind};
pub use tracker::ChangeTracker;
pub use write::{append_entity_rows, append_rows, upsert_or_delete};
