//! # Blocky Common
//!
//! Small building blocks shared by the Blocky crates:
//!
//! - [`hash`]: deterministic hashing of integer sequences
//! - [`id_generator`]: document-scoped block id generation
//! - [`slot`]: single-threaded observer registry with disposable subscriptions

pub mod hash;
pub mod id_generator;
pub mod slot;

pub use hash::{hash_int_array, hash_ints, DEFAULT_SEED};
pub use id_generator::{get_document_seed, IdGenerator};
pub use slot::{Slot, Subscription, SubscriptionGroup};
