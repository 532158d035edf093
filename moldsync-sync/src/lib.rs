//! # moldsync-sync
//!
//! The sync pass: read every mold master row, overwrite the mapped counters
//! of the matching live asset.
//!
//! Call [`SyncEngine::run`] for one pass, or [`pipeline::connect`] to build an
//! engine over two SQL databases from [`moldsync_core::Settings`].

pub mod checkout;
pub mod engine;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod sql;
pub mod store;

pub use checkout::{assign_machine_code, MachineAssignment};
pub use engine::{PassReport, SyncEngine, SyncPass};
pub use error::SyncError;
pub use memory::{MemorySource, MemoryTarget};
pub use sql::SqlStore;
pub use store::{SourceStore, TargetStore};
