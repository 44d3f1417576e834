//! # Reel Testkit
//!
//! Testing utilities for the Reel catalog.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenarios**: Named collections and parameters with the exact ids a view must show
//! - **Generators**: Proptest strategies for records, collections and view parameters
//! - **Fixtures**: A shared memory store with seeding helpers
//!
//! ## Scenarios
//!
//! ```rust
//! use reel_core::compose;
//! use reel_testkit::scenarios::all_scenarios;
//!
//! for scenario in all_scenarios() {
//!     let view = compose(&scenario.collection(), &scenario.params());
//!     assert_eq!(view.len(), scenario.expected.len(), "{}", scenario.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use reel_core::compose;
//! use reel_testkit::generators::{collection, view_params};
//!
//! proptest! {
//!     #[test]
//!     fn favorites_filter_holds(records in collection(20), params in view_params()) {
//!         let view = compose(&records, &params);
//!         prop_assert!(!params.favorites_only || view.iter().all(|r| r.favorite));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use reel_testkit::fixtures::TestFixture;
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let ids = fixture.seed_sample().await.unwrap();
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::{init_tracing, sample_collection, TestFixture};
pub use generators::{record_from_params, RecordParams};
pub use scenarios::{all_scenarios, verify_all_scenarios, ViewScenario};
