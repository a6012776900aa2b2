//! Operation results.

/// Result of a bulk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkInsertResult {
    pub affected_rows: u64,
}

/// Result of a bulk update.
///
/// Counts target rows matched by key, including rows already holding the
/// new values; rows that matched no target row do not count. This relies on
/// the connection reporting found rows (see `Connection::execute`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkUpdateResult {
    pub affected_rows: u64,
}

/// Result of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkDeleteResult {
    pub affected_rows: u64,
}

/// Result of a bulk merge.
///
/// `affected_rows` is always `inserted_rows + updated_rows`. `updated_rows`
/// counts staged rows whose key already existed, so re-running the same
/// merge reports the same counts with `inserted_rows` at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkMergeResult {
    pub affected_rows: u64,
    pub inserted_rows: u64,
    pub updated_rows: u64,
}

impl BulkMergeResult {
    pub fn new(inserted_rows: u64, updated_rows: u64) -> Self {
        Self {
            affected_rows: inserted_rows + updated_rows,
            inserted_rows,
            updated_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_counts_add_up() {
        let result = BulkMergeResult::new(1, 1);
        assert_eq!(
            result,
            BulkMergeResult {
                affected_rows: 2,
                inserted_rows: 1,
                updated_rows: 1,
            }
        );
        assert_eq!(BulkMergeResult::default().affected_rows, 0);
    }
}
