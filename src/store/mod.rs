//! Persistence seam for the ingestion pipeline.
//!
//! The pipeline only ever sees `dyn Store`; `PgStore` is the production
//! implementation and `MemoryStore` stands in for it in tests.

use async_trait::async_trait;

use crate::error::PersistError;

pub mod pg;
pub mod types;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;
pub use types::{NewItem, NewTrend, Subscription};

#[async_trait]
pub trait Store: Send + Sync {
    /// All subscriptions with `is_active = true`, oldest first.
    async fn active_subscriptions(&self) -> Result<Vec<Subscription>, PersistError>;

    /// Inserts without a summary and returns the new row id.
    async fn insert_item(&self, item: &NewItem) -> Result<i64, PersistError>;

    async fn set_summary(&self, id: i64, summary: &str) -> Result<(), PersistError>;

    async fn insert_trend(&self, trend: &NewTrend) -> Result<i64, PersistError>;
}
