//! # Reel Store
//!
//! Storage abstraction for the Reel catalog. Provides trait-based interfaces
//! for record and preference persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! Records live behind [`RecordStore`], preferences behind
//! [`PreferenceStore`]. Both are observable: list queries return a
//! [`LiveQuery`] that re-emits after every mutation, and preferences are
//! published as a whole map that [`PrefWatch`] narrows to one typed key.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - CRUD plus live list queries
//! - [`PreferenceStore`] / [`PreferenceStoreExt`] - Observable key-value settings
//! - [`SqliteStore`] - SQLite-based persistent storage for both
//! - [`MemoryStore`] - In-memory storage for tests, with fault injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reel_core::{keys, Record, SortOrder};
//! use reel_store::{PreferenceStoreExt, RecordStore, SqliteStore};
//!
//! async fn example() -> reel_store::Result<()> {
//!     let store = SqliteStore::open("catalog.db")?;
//!
//!     let mut all = store.list_all();
//!     store.insert(&Record::new("Alien", "Ridley Scott", 1979, "Horror")).await?;
//!     let _records = all.next().await;
//!
//!     store.set(keys::SORT_ORDER, SortOrder::YearDesc).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Coalescing**: a burst of writes yields one re-query with the final state
//! - **Store-assigned ids**: `insert` ignores the caller's id; ids are never reused
//! - **Idempotent deletes**: deleting a missing record succeeds
//! - **Ordered preference writes**: the last write to a key wins

pub mod error;
pub mod live;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use live::{LiveQuery, PrefWatch, QueryFn, QueryFuture};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{PreferenceStore, PreferenceStoreExt, RecordStore};
