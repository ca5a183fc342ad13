//! # so-db
//!
//! Record store gateway for the service-order backend.
//!
//! - [`RecordStore`]: uninterpreted CRUD over named [`Collection`]s plus the
//!   eager-loaded order aggregate
//! - [`PgRecordStore`]: PostgreSQL through SQLx, rows marshalled as JSONB
//! - [`MemoryRecordStore`]: process-local store honoring the same foreign keys
//! - [`ObservedStore`]: decorator publishing row events on a [`ChangeFeed`]
//!
//! ## Example
//!
//! ```ignore
//! use so_db::{Database, DatabaseConfig, PgRecordStore, RecordStore, ListQuery};
//! use so_models::Collection;
//!
//! let db = Database::connect(&DatabaseConfig::with_url(url)).await?;
//! let store = PgRecordStore::new(db.pool().clone());
//! let team = store.list(Collection::Team, ListQuery::by_id()).await?;
//! ```

pub mod aggregate;
pub mod feed;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;
pub mod schema;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use feed::{ChangeFeed, ChangeKind, LiveListing, ObservedStore, RowEvent};
pub use memory::MemoryRecordStore;
pub use pool::{Database, DatabaseConfig, PoolStats};
pub use postgres::PgRecordStore;
pub use repository::{row_id, ListQuery, RecordStore, Row, StoreError, StoreResult};
pub use so_models::Collection;
