//! Row codecs for the materialized tables.
//!
//! All rows use hand-rolled big-endian encodings: fixed-width integers,
//! u32-length-prefixed byte strings, and signed-big-endian amounts. History
//! rows duplicate their subject fields in the value so a row decodes without
//! its key.

mod entity;
mod ledger;
mod metadata;
mod supply;
mod transaction;
mod vault;

pub use entity::EntityRow;
pub use ledger::{TopOfLedgerRow, TOP_OF_LEDGER_KEY};
pub use metadata::{MetadataAggregateRow, MetadataEntryRow};
pub use supply::ResourceSupplyRow;
pub use transaction::TransactionRow;
pub use vault::{ResourceHolderRow, VaultBalanceRow};

use crate::{StoreResult, Table};

/// A row appended to one of the append-only history tables.
///
/// Keys are `subject prefix ++ from_state_version` big-endian, so per-subject
/// rows sort by version and the latest one is a reverse seek away.
pub trait HistoryRow: Sized {
    const TABLE: Table;

    /// Full storage key for this row.
    fn key(&self) -> Vec<u8>;

    /// Encode the row value.
    fn encode(&self) -> Vec<u8>;

    /// Decode a row value.
    fn decode(value: &[u8]) -> StoreResult<Self>;
}

/// A row in a mutable "current value" table.
///
/// Unlike history rows these are upserted in place, and a row whose value
/// reaches the table's empty sentinel is deleted rather than written.
pub trait CurrentRow: Sized {
    const TABLE: Table;

    fn key(&self) -> Vec<u8>;

    fn encode(&self) -> Vec<u8>;

    fn decode(value: &[u8]) -> StoreResult<Self>;

    /// Row should be deleted rather than written when this holds.
    fn is_empty_value(&self) -> bool;
}

/// Shared primitives for the hand-rolled codecs.
pub(crate) mod codec {
    use crate::{StoreError, StoreResult};
    use vellum_core::TokenAmount;

    pub fn take<'a>(data: &mut &'a [u8], n: usize, what: &str) -> StoreResult<&'a [u8]> {
        if data.len() < n {
            return Err(StoreError::Deserialization(format!(
                "{what}: need {n} bytes, have {}",
                data.len()
            )));
        }
        let (head, tail) = data.split_at(n);
        *data = tail;
        Ok(head)
    }

    pub fn read_u8(data: &mut &[u8], what: &str) -> StoreResult<u8> {
        Ok(take(data, 1, what)?[0])
    }

    pub fn read_bool(data: &mut &[u8], what: &str) -> StoreResult<bool> {
        match read_u8(data, what)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StoreError::Deserialization(format!(
                "{what}: invalid bool tag {other}"
            ))),
        }
    }

    pub fn read_u32(data: &mut &[u8], what: &str) -> StoreResult<u32> {
        let bytes = take(data, 4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(data: &mut &[u8], what: &str) -> StoreResult<u64> {
        let bytes = take(data, 8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_i64(data: &mut &[u8], what: &str) -> StoreResult<i64> {
        let bytes = take(data, 8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(buf))
    }

    pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(bytes);
    }

    pub fn read_bytes(data: &mut &[u8], what: &str) -> StoreResult<Vec<u8>> {
        let len = read_u32(data, what)? as usize;
        Ok(take(data, len, what)?.to_vec())
    }

    pub fn write_string(buf: &mut Vec<u8>, s: &str) {
        write_bytes(buf, s.as_bytes());
    }

    pub fn read_string(data: &mut &[u8], what: &str) -> StoreResult<String> {
        let bytes = read_bytes(data, what)?;
        String::from_utf8(bytes)
            .map_err(|_| StoreError::Deserialization(format!("{what}: invalid utf-8")))
    }

    pub fn write_opt_bytes(buf: &mut Vec<u8>, bytes: Option<&[u8]>) {
        match bytes {
            Some(bytes) => {
                buf.push(1);
                write_bytes(buf, bytes);
            }
            None => buf.push(0),
        }
    }

    pub fn read_opt_bytes(data: &mut &[u8], what: &str) -> StoreResult<Option<Vec<u8>>> {
        if read_bool(data, what)? {
            Ok(Some(read_bytes(data, what)?))
        } else {
            Ok(None)
        }
    }

    pub fn write_opt_u64(buf: &mut Vec<u8>, value: Option<u64>) {
        match value {
            Some(value) => {
                buf.push(1);
                buf.extend_from_slice(&value.to_be_bytes());
            }
            None => buf.push(0),
        }
    }

    pub fn read_opt_u64(data: &mut &[u8], what: &str) -> StoreResult<Option<u64>> {
        if read_bool(data, what)? {
            Ok(Some(read_u64(data, what)?))
        } else {
            Ok(None)
        }
    }

    pub fn write_amount(buf: &mut Vec<u8>, amount: &TokenAmount) {
        write_bytes(buf, &amount.to_signed_bytes_be());
    }

    pub fn read_amount(data: &mut &[u8], what: &str) -> StoreResult<TokenAmount> {
        let bytes = read_bytes(data, what)?;
        Ok(TokenAmount::from_signed_bytes_be(&bytes))
    }
}
