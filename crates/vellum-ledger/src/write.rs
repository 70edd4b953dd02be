use vellum_store::rows::{CurrentRow, EntityRow, HistoryRow};
use vellum_store::WriteBatch;

/// Stage append-only history rows into `batch`. Returns the number staged.
pub fn append_rows<R: HistoryRow>(batch: &mut WriteBatch, rows: &[R]) -> usize {
    for row in rows {
        batch.put(R::TABLE, row.key(), row.encode());
    }
    rows.len()
}

/// Stage rows for the entities a batch created. Entity rows are keyed by
/// address rather than versioned, but only ever written once.
pub fn append_entity_rows(batch: &mut WriteBatch, rows: &[EntityRow]) -> usize {
    for row in rows {
        batch.put(EntityRow::TABLE, row.key(), row.encode());
    }
    rows.len()
}

/// Stage final current-value rows into `batch`: rows carrying the table's
/// empty sentinel become deletes, everything else an upsert. Returns
/// `(written, deleted)`.
///
/// Callers hand over rows whose values the reconciler has already settled
/// against the loaded current table, so no read happens here.
pub fn upsert_or_delete<'a, R: CurrentRow + 'a>(
    batch: &mut WriteBatch,
    rows: impl IntoIterator<Item = &'a R>,
) -> (usize, usize) {
    let mut written = 0;
    let mut deleted = 0;
    for row in rows {
        if row.is_empty_value() {
            batch.delete(R::TABLE, row.key());
            deleted += 1;
        } else {
            batch.put(R::TABLE, row.key(), row.encode());
            written += 1;
        }
    }
    (written, deleted)
}
