//! # tribune-store
//!
//! Storage layer for the Tribune message pipeline.
//!
//! Persistence is abstracted behind four narrow traits ([`TemplateStore`],
//! [`PendingStore`], [`LedgerStore`] and [`AuditStore`]) so the services in
//! `tribune-core` never care which backend they run on.  Two backends ship
//! with the crate: [`MemoryStore`], a lock-protected in-process map used by
//! tests and ephemeral deployments, and [`SqliteStore`], a synchronous
//! `rusqlite`-backed store with schema migrations.

pub mod audit;
pub mod database;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod pending;
pub mod reactions;
pub mod sqlite;
pub mod templates;
pub mod traits;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuditStore, LedgerStore, PendingStore, TemplateStore};
