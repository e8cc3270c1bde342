//! # taskdb Store
//!
//! Durable per-user document store for the taskdb data layer.
//!
//! This crate provides:
//! - [`DocumentBackend`] - opaque per-document byte store trait, with
//!   in-memory and file implementations
//! - [`Item`] - the task document model (JSON persisted shape)
//! - [`DocumentStore`] - typed CRUD with ownership enforcement, an owner
//!   value index, and a change feed
//! - [`ChangeFeed`] - committed-write notification for live queries
//!
//! ## Design principles
//!
//! - Backends are simple per-document byte stores; the store owns all
//!   payload interpretation
//! - Every mutation is a single atomic per-document operation
//! - Mutations are gated by [`OwnershipGuard`]; reads never are
//! - Change events are emitted only after the write has committed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod change;
mod error;
mod file;
mod guard;
mod index;
mod item;
mod memory;
mod store;

pub use backend::DocumentBackend;
pub use change::{ChangeEvent, ChangeFeed, ChangeType};
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use guard::{Access, OwnershipGuard};
pub use index::OwnerIndex;
pub use item::{new_item_id, Item};
pub use memory::InMemoryBackend;
pub use store::{DocumentStore, OWNER_INDEX, TASKS_COLLECTION};
