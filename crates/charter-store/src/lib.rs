//! # Charter Store
//!
//! Storage abstraction for Charter. Provides trait-based interfaces for
//! chain and identity persistence with file, SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! Chains live behind [`ChainStore`], the node identity behind
//! [`IdentityStore`]. Components never compute their own storage paths;
//! the caller opens a store at an explicit location and hands it in.
//!
//! ## Key Types
//!
//! - [`ChainStore`] - Append-only persistence for hash chains
//! - [`IdentityStore`] - Whole-record persistence for the node identity
//! - [`JsonlChainStore`] / [`FileIdentityStore`] - Line-oriented files
//! - [`SqliteStore`] - SQLite-based persistent storage (both traits)
//! - [`MemoryStore`] - In-memory storage for tests (both traits)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use charter_core::{ChainId, EntryBuilder, IdentityRecord};
//! use charter_store::{ChainStore, ChainStoreExt, JsonlChainStore};
//!
//! let store = JsonlChainStore::open("/var/lib/charter").unwrap();
//! let identity = IdentityRecord::generate(None, "node-");
//! let chain = ChainId::identity();
//!
//! store
//!     .append_with(&chain, |head| {
//!         identity.sign(EntryBuilder::after(head).event("identity_created"))
//!     })
//!     .unwrap();
//!
//! assert!(store.verify_integrity(&chain).unwrap().intact);
//! ```
//!
//! ## Design Notes
//!
//! - **Serialized appends**: head read, entry build and write happen in one
//!   critical section per store
//! - **Conflict detection**: an entry that does not follow the head returns
//!   `Conflict` and nothing is written
//! - **Tolerant reads**: unparseable stored entries are skipped, not fatal

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use jsonl::{FileIdentityStore, JsonlChainStore};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{check_link, ChainStore, ChainStoreExt, IdentityStore};
