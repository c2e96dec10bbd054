//! Versioned object store for chaos campaigns.
//!
//! The reconciler talks to the cluster only through [`ObjectStore`] and
//! [`CrdDiscovery`]. [`InMemoryObjectStore`] reproduces the semantics it
//! relies on (resource versions, finalizers, delayed deletion) and records
//! every call for inspection.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod discovery;
pub mod error;
pub mod memory;
pub mod options;
pub mod patch;
pub mod result;
pub mod store;

pub use discovery::{CrdDiscovery, StaticCrdDiscovery, RESULT_DEFINITION};
pub use error::{Result, StoreError};
pub use memory::{InMemoryObjectStore, OperationKind, StoreOperation};
pub use options::{DeleteOptions, PropagationPolicy};
pub use result::StoreResultExt;
pub use store::{ObjectStore, ObjectStoreExt, TracingObjectStore};
