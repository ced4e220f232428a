//! # tribune-core
//!
//! The services of the Tribune message pipeline:
//!
//! - [`TemplateCatalog`]  -- template CRUD, search, and rendering
//! - [`ValidationWorkflow`] -- the pending-message moderation state machine
//! - [`BulkCoordinator`]  -- bounded-parallel batch validation
//! - [`DeliveryLedger`]   -- append-only message log with monotonic status
//!                           and reaction toggles
//! - [`PresenceTracker`]  -- ephemeral per-conversation typing indicators
//!
//! Services are storage-agnostic: each one holds `Arc<dyn ...Store>` handles
//! from `tribune-store` and serializes its per-entity critical sections
//! through [`EntityLocks`].

pub mod bulk;
pub mod catalog;
pub mod ledger;
pub mod locks;
pub mod presence;
pub mod validation;

mod error;

pub use bulk::{BulkCoordinator, BulkReport, DEFAULT_CONCURRENCY};
pub use catalog::TemplateCatalog;
pub use error::{CoreError, Result};
pub use ledger::{DeliveryLedger, NewDirectMessage};
pub use locks::EntityLocks;
pub use presence::PresenceTracker;
pub use validation::{Resolution, ValidationWorkflow};
