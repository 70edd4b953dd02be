//! # vellum-tests
//!
//! Cross-crate tests for the vellum ledger-extension engine.
//!
//! This crate provides:
//! - A harness opening a temporary store behind a ready-to-use extender
//! - Generators for committed transactions and their substate changes
//! - Scenario tests for the full batch pipeline and each processor
//! - Property-based tests for the engine's core invariants

pub mod generators;
pub mod harness;

#[cfg(test)]
mod extension_tests;


#[cfg(test)]
mod supply_tests;



pub use generators::*;
pub use harness::*;
