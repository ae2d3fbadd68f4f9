//! Usage accounting for completed extractions.

use crate::db::{usage_repo, Database, DatabaseError};

pub const RECIPE_EXTRACTIONS: &str = "recipe_extractions";

pub trait UsageRecorder: Send + Sync {
    /// Counts one successful extraction for `user_id`.
    fn record_extraction(&self, user_id: &str) -> Result<(), DatabaseError>;
}

/// Counters in the `usage_counters` table.
#[derive(Clone)]
pub struct SqliteUsageRecorder {
    db: Database,
}

impl SqliteUsageRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn extractions(&self, user_id: &str) -> Result<u64, DatabaseError> {
        usage_repo::get(&self.db, user_id, RECIPE_EXTRACTIONS)
    }
}

impl UsageRecorder for SqliteUsageRecorder {
    fn record_extraction(&self, user_id: &str) -> Result<(), DatabaseError> {
        let count = usage_repo::increment(&self.db, user_id, RECIPE_EXTRACTIONS)?;
        log::debug!("User {} now has {} extractions", user_id, count);
        Ok(())
    }
}
