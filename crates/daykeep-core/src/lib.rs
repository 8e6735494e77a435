//! daykeep-core - Core library for Daykeep
//!
//! This crate contains the shared models, the local document store, and the
//! offline-first sync engine used by all Daykeep interfaces.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
pub mod sync;
mod util;

pub use error::{Error, Result};
pub use models::Snapshot;
pub use state::SyncState;
