//! # taskdb Live
//!
//! Live queries over the taskdb document store.
//!
//! This crate provides:
//! - [`CachedQuery`] - standing queries compiled once per session
//! - [`LiveQueryEngine`] - single-subscription change delivery through an
//!   explicit one-consumer channel
//!
//! ## Delivery model
//!
//! The engine listens to the store's change feed on a worker thread. Each
//! change batch triggers one recomputation and one delivery of the full
//! materialized, ordered result list. Teardown is explicit: unsubscribing
//! guarantees no delivery attempt after the call returns.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod query;

pub use engine::{LiveQueryEngine, Subscription};
pub use query::{CachedQuery, QueryScope};
