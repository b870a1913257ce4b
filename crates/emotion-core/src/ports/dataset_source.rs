//! Dataset source port for loading labeled landmark tables.

use crate::domain::RawTable;

/// Port for loading a raw landmark table.
pub trait DatasetSource: Send + Sync {
    /// Loads the full table.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> anyhow::Result<RawTable>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}
