//! Engine bookkeeping rows.

use super::codec::read_u64;
use crate::{StoreResult, Table};
use vellum_core::StateVersion;

/// Key of the single top-of-ledger row.
pub const TOP_OF_LEDGER_KEY: &[u8] = b"top_of_ledger";

/// The last state version the engine durably committed. Written with every
/// batch; batch admission is validated against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopOfLedgerRow {
    pub state_version: StateVersion,
}

impl TopOfLedgerRow {
    pub const TABLE: Table = Table::LedgerState;

    pub fn encode(&self) -> Vec<u8> {
        self.state_version.to_be_bytes().to_vec()
    }

    pub fn decode(value: &[u8]) -> StoreResult<Self> {
        let mut data = value;
        let state_version = StateVersion::new(read_u64(&mut data, "top_of_ledger.version")?);
        Ok(Self { state_version })
    }
}
