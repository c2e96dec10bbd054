//! Uniform view over every object kind the store holds.

use serde_json::Value;

use crate::chaos_result::ChaosResult;
use crate::engine::ChaosEngine;
use crate::error::{Error, Result};
use crate::meta::{ObjectKind, ObjectMeta};
use crate::workload::{Job, Pod};

/// A stored object of any known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    ChaosEngine(ChaosEngine),
    ChaosResult(ChaosResult),
    Pod(Pod),
    Job(Job),
}

impl Resource {
    /// Kind of the wrapped object.
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::ChaosEngine(_) => ObjectKind::ChaosEngine,
            Self::ChaosResult(_) => ObjectKind::ChaosResult,
            Self::Pod(_) => ObjectKind::Pod,
            Self::Job(_) => ObjectKind::Job,
        }
    }

    /// Metadata of the wrapped object.
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ChaosEngine(o) => &o.metadata,
            Self::ChaosResult(o) => &o.metadata,
            Self::Pod(o) => &o.metadata,
            Self::Job(o) => &o.metadata,
        }
    }

    /// Mutable metadata of the wrapped object.
    pub const fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::ChaosEngine(o) => &mut o.metadata,
            Self::ChaosResult(o) => &mut o.metadata,
            Self::Pod(o) => &mut o.metadata,
            Self::Job(o) => &mut o.metadata,
        }
    }

    /// Serialize the wrapped object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if serialization fails.
    pub fn to_json(&self) -> Result<Value> {
        let encoded = match self {
            Self::ChaosEngine(o) => serde_json::to_value(o),
            Self::ChaosResult(o) => serde_json::to_value(o),
            Self::Pod(o) => serde_json::to_value(o),
            Self::Job(o) => serde_json::to_value(o),
        };
        encoded.map_err(|e| Error::decode(self.kind().to_string(), e.to_string()))
    }

    /// Decode a serialized object of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the value does not match the kind.
    pub fn from_json(kind: ObjectKind, value: Value) -> Result<Self> {
        let decoded = match kind {
            ObjectKind::ChaosEngine => serde_json::from_value(value).map(Self::ChaosEngine),
            ObjectKind::ChaosResult => serde_json::from_value(value).map(Self::ChaosResult),
            ObjectKind::Pod => serde_json::from_value(value).map(Self::Pod),
            ObjectKind::Job => serde_json::from_value(value).map(Self::Job),
        };
        decoded.map_err(|e| Error::decode(kind.to_string(), e.to_string()))
    }
}

/// Typed object that can be stored as a [`Resource`].
pub trait Object: Clone + Send + Sync + 'static {
    /// Kind stored under.
    const KIND: ObjectKind;

    /// Object metadata.
    fn metadata(&self) -> &ObjectMeta;

    /// Mutable object metadata.
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Wrap as a resource.
    fn into_resource(self) -> Resource;

    /// Unwrap from a resource of the matching kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the resource is of a different kind.
    fn from_resource(resource: Resource) -> Result<Self>;
}

macro_rules! impl_object {
    ($ty:ident) => {
        impl Object for $ty {
            const KIND: ObjectKind = ObjectKind::$ty;

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn into_resource(self) -> Resource {
                Resource::$ty(self)
            }

            fn from_resource(resource: Resource) -> Result<Self> {
                match resource {
                    Resource::$ty(inner) => Ok(inner),
                    other => Err(Error::decode(
                        ObjectKind::$ty.to_string(),
                        format!("found {}", other.kind()),
                    )),
                }
            }
        }
    };
}

impl_object!(ChaosEngine);
impl_object!(ChaosResult);
impl_object!(Pod);
impl_object!(Job);
