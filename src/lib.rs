#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # chaos-operator
//!
//! Drives chaos experiment campaigns through their lifecycle against a
//! versioned object store.
//!
//! This library re-exports the workspace crates for convenience.

pub use chaos_core;
pub use chaos_reconciler;
pub use chaos_store;

pub mod prelude;
