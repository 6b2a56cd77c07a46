//! # Charter Testkit
//!
//! Testing utilities for Charter.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Entries with known canonical bytes, hashes and
//!   signatures, pinning the on-disk format
//! - **Generators**: Proptest strategies for payloads, chains and tool facts
//! - **Fixtures**: A [`TestFixture`] over in-memory stores, sample
//!   governance and tool facts
//!
//! ## Golden Vectors
//!
//! ```rust
//! use charter_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use charter_testkit::generators::{chain_from_params, ChainParams};
//!
//! proptest! {
//!     #[test]
//!     fn chain_is_intact(params: ChainParams) {
//!         let chain = chain_from_params(&params);
//!         prop_assert!(charter_core::verify_integrity(&chain).intact);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use charter_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let entries = fixture.append_events(3);
//! assert_eq!(entries[2].index, 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{sample_config, sample_governance, TestFixture};
pub use generators::{chain_from_params, ChainParams};
pub use vectors::{all_vectors, build_golden_chain, verify_all_vectors, GoldenVector};
