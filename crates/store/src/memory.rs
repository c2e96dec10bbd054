//! In-memory object store.
//!
//! Mirrors the behaviour reconcilers depend on in a real cluster:
//! resource versions and update conflicts, finalizers holding back
//! deletion, and deletions that become visible only after a delay. Every
//! call is recorded so tests can assert on what was asked of the store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chaos_core::{LabelSelector, Object, ObjectKey, ObjectKind, Resource};
use chrono::Utc;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::error::{Result, StoreError};
use crate::options::DeleteOptions;
use crate::patch::{apply_merge_patch, create_merge_patch, is_empty_patch, strip_path};
use crate::store::ObjectStore;

/// Store operation names, used for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Get,
    List,
    Create,
    Update,
    MergePatch,
    Delete,
    DeleteAllOf,
}

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Get {
        kind: ObjectKind,
        key: ObjectKey,
    },
    List {
        kind: ObjectKind,
        namespace: String,
        selector: LabelSelector,
    },
    Create {
        kind: ObjectKind,
        key: ObjectKey,
    },
    Update {
        kind: ObjectKind,
        key: ObjectKey,
    },
    MergePatch {
        kind: ObjectKind,
        key: ObjectKey,
    },
    Delete {
        kind: ObjectKind,
        key: ObjectKey,
        options: DeleteOptions,
    },
    DeleteAllOf {
        kind: ObjectKind,
        namespace: String,
        selector: LabelSelector,
        options: DeleteOptions,
    },
}

impl StoreOperation {
    /// Operation name of this call.
    pub const fn operation(&self) -> OperationKind {
        match self {
            Self::Get { .. } => OperationKind::Get,
            Self::List { .. } => OperationKind::List,
            Self::Create { .. } => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::MergePatch { .. } => OperationKind::MergePatch,
            Self::Delete { .. } => OperationKind::Delete,
            Self::DeleteAllOf { .. } => OperationKind::DeleteAllOf,
        }
    }

    /// Kind of object the call addressed.
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Get { kind, .. }
            | Self::List { kind, .. }
            | Self::Create { kind, .. }
            | Self::Update { kind, .. }
            | Self::MergePatch { kind, .. }
            | Self::Delete { kind, .. }
            | Self::DeleteAllOf { kind, .. } => *kind,
        }
    }
}

/// An injected failure.
#[derive(Debug, Clone)]
struct Fault {
    error: StoreError,
    /// `None` fails forever.
    remaining: Option<u32>,
}

type SlotKey = (ObjectKind, ObjectKey);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<SlotKey, Resource>,
    /// Deleted objects still visible, with the number of reads left.
    terminating: BTreeMap<SlotKey, u32>,
    faults: HashMap<(OperationKind, ObjectKind), Fault>,
    log: Vec<StoreOperation>,
    last_version: u64,
    deletion_lag: u32,
}

impl Inner {
    fn next_version(&mut self) -> u64 {
        self.last_version = self.last_version.saturating_add(1);
        self.last_version
    }

    fn check_fault(&mut self, op: OperationKind, kind: ObjectKind) -> Result<()> {
        let Some(fault) = self.faults.get_mut(&(op, kind)) else {
            return Ok(());
        };
        let error = fault.error.clone();
        match fault.remaining {
            None => {}
            Some(n) if n > 1 => fault.remaining = Some(n - 1),
            Some(_) => {
                self.faults.remove(&(op, kind));
            }
        }
        Err(error)
    }

    /// Advance deletions of a kind by one read, dropping the ones
    /// whose lag has run out.
    fn tick_terminating(&mut self, kind: ObjectKind) {
        let mut expired = Vec::new();
        for (slot, remaining) in self.terminating.iter_mut().filter(|(s, _)| s.0 == kind) {
            if *remaining == 0 {
                expired.push(slot.clone());
            } else {
                *remaining = remaining.saturating_sub(1);
            }
        }
        for slot in expired {
            self.terminating.remove(&slot);
            self.objects.remove(&slot);
        }
    }

    /// Request deletion of one stored object.
    fn request_delete(&mut self, slot: &SlotKey) {
        let version = self.next_version();
        let lag = self.deletion_lag;
        let Some(resource) = self.objects.get_mut(slot) else {
            return;
        };
        let meta = resource.metadata_mut();
        if meta.deletion_timestamp.is_some() {
            return;
        }
        meta.deletion_timestamp = Some(Utc::now());
        meta.resource_version = version;
        if !meta.finalizers.is_empty() {
            return;
        }
        if lag == 0 {
            self.objects.remove(slot);
        } else {
            self.terminating.insert(slot.clone(), lag);
        }
    }

    /// Store a written object, releasing it if deletion was requested and
    /// no finalizer holds it back.
    fn store(&mut self, slot: SlotKey, resource: Resource) -> Resource {
        let meta = resource.metadata();
        if meta.is_deleting() && meta.finalizers.is_empty() {
            self.objects.remove(&slot);
            self.terminating.remove(&slot);
        } else {
            self.objects.insert(slot, resource.clone());
        }
        resource
    }
}

fn slot_of(resource: &Resource) -> SlotKey {
    (resource.kind(), resource.metadata().key())
}

/// In-memory object store for testing.
#[derive(Default)]
pub struct InMemoryObjectStore {
    inner: RwLock<Inner>,
}

impl InMemoryObjectStore {
    /// Create a new in-memory object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory object store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Keep deleted objects visible for this many further reads (gets or
    /// lists) of their kind before they disappear.
    pub async fn set_deletion_lag(&self, reads: u32) {
        self.inner.write().await.deletion_lag = reads;
    }

    /// Fail every call of `op` on `kind` with `error`.
    pub async fn fail(&self, op: OperationKind, kind: ObjectKind, error: StoreError) {
        self.inner.write().await.faults.insert(
            (op, kind),
            Fault {
                error,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls of `op` on `kind` with `error`.
    pub async fn fail_times(
        &self,
        op: OperationKind,
        kind: ObjectKind,
        error: StoreError,
        times: u32,
    ) {
        if times == 0 {
            return;
        }
        self.inner.write().await.faults.insert(
            (op, kind),
            Fault {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Insert an object directly, bypassing faults and the call log.
    /// Assigns a uid if empty and a fresh resource version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the stored object cannot be
    /// read back as `T`.
    pub async fn insert<T: Object>(&self, object: T) -> Result<T> {
        let mut inner = self.inner.write().await;
        let mut resource = object.into_resource();
        let version = inner.next_version();
        let meta = resource.metadata_mut();
        if meta.uid.is_empty() {
            meta.uid = Ulid::new().to_string();
        }
        meta.resource_version = version;
        let slot = slot_of(&resource);
        inner.objects.insert(slot, resource.clone());
        Ok(T::from_resource(resource)?)
    }

    /// Read an object directly, bypassing faults and the call log.
    pub async fn snapshot<T: Object>(&self, key: &ObjectKey) -> Option<T> {
        let inner = self.inner.read().await;
        inner
            .objects
            .get(&(T::KIND, key.clone()))
            .cloned()
            .and_then(|r| T::from_resource(r).ok())
    }

    /// Every stored object of a kind in a namespace, terminating included.
    pub async fn objects<T: Object>(&self, namespace: &str) -> Vec<T> {
        let inner = self.inner.read().await;
        inner
            .objects
            .iter()
            .filter(|((kind, key), _)| *kind == T::KIND && key.namespace == namespace)
            .filter_map(|(_, r)| T::from_resource(r.clone()).ok())
            .collect()
    }

    /// Calls made so far, in order.
    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.inner.read().await.log.clone()
    }

    /// Forget recorded calls.
    pub async fn clear_operations(&self) {
        self.inner.write().await.log.clear();
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<Resource> {
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::Get {
            kind,
            key: key.clone(),
        });
        inner.check_fault(OperationKind::Get, kind)?;
        inner.tick_terminating(kind);

        inner
            .objects
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, key))
    }

    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Resource>> {
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::List {
            kind,
            namespace: namespace.to_string(),
            selector: selector.clone(),
        });
        inner.check_fault(OperationKind::List, kind)?;
        inner.tick_terminating(kind);

        Ok(inner
            .objects
            .iter()
            .filter(|((k, key), r)| {
                *k == kind && key.namespace == namespace && selector.matches(&r.metadata().labels)
            })
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn create(&self, mut object: Resource) -> Result<Resource> {
        let slot = slot_of(&object);
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::Create {
            kind: slot.0,
            key: slot.1.clone(),
        });
        inner.check_fault(OperationKind::Create, slot.0)?;

        if inner.objects.contains_key(&slot) {
            return Err(StoreError::already_exists(slot.0, &slot.1));
        }
        let version = inner.next_version();
        let meta = object.metadata_mut();
        if meta.uid.is_empty() {
            meta.uid = Ulid::new().to_string();
        }
        meta.resource_version = version;
        meta.deletion_timestamp = None;
        inner.objects.insert(slot, object.clone());
        Ok(object)
    }

    async fn update(&self, mut object: Resource) -> Result<Resource> {
        let slot = slot_of(&object);
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::Update {
            kind: slot.0,
            key: slot.1.clone(),
        });
        inner.check_fault(OperationKind::Update, slot.0)?;

        let current = inner
            .objects
            .get(&slot)
            .ok_or_else(|| StoreError::not_found(slot.0, &slot.1))?
            .metadata()
            .clone();
        let expected = object.metadata().resource_version;
        if expected != current.resource_version {
            return Err(StoreError::conflict(
                slot.0,
                &slot.1,
                expected,
                current.resource_version,
            ));
        }

        let version = inner.next_version();
        let meta = object.metadata_mut();
        meta.uid = current.uid;
        meta.deletion_timestamp = current.deletion_timestamp;
        meta.resource_version = version;
        Ok(inner.store(slot, object))
    }

    async fn merge_patch(&self, base: &Resource, object: &Resource) -> Result<Resource> {
        let slot = slot_of(object);
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::MergePatch {
            kind: slot.0,
            key: slot.1.clone(),
        });
        inner.check_fault(OperationKind::MergePatch, slot.0)?;

        let current = inner
            .objects
            .get(&slot)
            .cloned()
            .ok_or_else(|| StoreError::not_found(slot.0, &slot.1))?;

        let mut patch = create_merge_patch(&base.to_json()?, &object.to_json()?);
        for immutable in ["resourceVersion", "uid", "deletionTimestamp", "name", "namespace"] {
            strip_path(&mut patch, &["metadata", immutable]);
        }
        if is_empty_patch(&patch) {
            return Ok(current);
        }

        let mut doc = current.to_json()?;
        apply_merge_patch(&mut doc, &patch);
        let mut patched = Resource::from_json(slot.0, doc)?;
        let version = inner.next_version();
        patched.metadata_mut().resource_version = version;
        Ok(inner.store(slot, patched))
    }

    async fn delete(
        &self,
        kind: ObjectKind,
        key: &ObjectKey,
        options: &DeleteOptions,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::Delete {
            kind,
            key: key.clone(),
            options: *options,
        });
        inner.check_fault(OperationKind::Delete, kind)?;

        let slot = (kind, key.clone());
        if !inner.objects.contains_key(&slot) {
            return Err(StoreError::not_found(kind, key));
        }
        inner.request_delete(&slot);
        Ok(())
    }

    async fn delete_all_of(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
        options: &DeleteOptions,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.log.push(StoreOperation::DeleteAllOf {
            kind,
            namespace: namespace.to_string(),
            selector: selector.clone(),
            options: *options,
        });
        inner.check_fault(OperationKind::DeleteAllOf, kind)?;

        let matching: Vec<SlotKey> = inner
            .objects
            .iter()
            .filter(|((k, key), r)| {
                *k == kind && key.namespace == namespace && selector.matches(&r.metadata().labels)
            })
            .map(|(slot, _)| slot.clone())
            .collect();
        for slot in &matching {
            inner.request_delete(slot);
        }
        Ok(())
    }
}
