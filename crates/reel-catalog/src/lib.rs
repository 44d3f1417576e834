//! # Reel Catalog
//!
//! A reactive, always-consistent view over a personal collection.
//!
//! ## Overview
//!
//! The [`Catalog`] combines four independently changing inputs into one
//! [`ViewState`](reel_core::ViewState):
//!
//! - the live collection from a [`RecordStore`](reel_store::RecordStore),
//! - the persisted favorites-only flag and sort order from a
//!   [`PreferenceStore`](reel_store::PreferenceStore),
//! - the in-memory search text.
//!
//! Subscribers get the latest snapshot through a [`ViewSubscription`]. All
//! mutations are fire-and-forget; their effects reach the view through the
//! stores, never directly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reel_catalog::{Catalog, CatalogConfig};
//! use reel_core::{Record, SortOrder};
//! use reel_store::SqliteStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteStore::open("catalog.db")?);
//!     let catalog = Catalog::with_store(store, CatalogConfig::default());
//!
//!     let mut view = catalog.view();
//!     catalog.insert(Record::new("Alien", "Ridley Scott", 1979, "Horror"));
//!     catalog.set_sort_order(SortOrder::YearDesc);
//!     catalog.set_search_text("ali");
//!
//!     while let Some(state) = view.changed().await {
//!         println!("{} records", state.records.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Latest value wins**: bursts of input coalesce; the final state is
//!   always delivered
//! - **Idempotent publishing**: a recomputation equal to the current snapshot
//!   is not re-emitted
//! - **Lingering teardown**: upstream subscriptions are released a grace
//!   period after the last subscriber leaves
//! - **Ordered writes**: mutations run in call order per target (records,
//!   preferences)

pub mod catalog;
pub mod engine;
pub mod error;
pub mod param;

pub use catalog::{Catalog, CatalogConfig, Pending};
pub use engine::{Engine, ViewSubscription};
pub use error::{CatalogError, FailureKind, MutationFailure, Operation, Result};
pub use param::ParamChannel;
