//! Object store trait and wrappers.

use std::sync::Arc;

use async_trait::async_trait;
use chaos_core::{LabelSelector, Object, ObjectKey, ObjectKind, Resource};

use crate::error::Result;
use crate::options::DeleteOptions;

/// Versioned, namespaced object store with optimistic concurrency.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read one object.
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<Resource>;

    /// List objects of a kind in a namespace matching a label selector.
    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Resource>>;

    /// Create an object. Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, object: Resource) -> Result<Resource>;

    /// Replace an object. Fails with `Conflict` if its resource version is
    /// stale.
    async fn update(&self, object: Resource) -> Result<Resource>;

    /// Apply the merge patch from `base` to `object` onto the stored
    /// object. Only fields that differ between the two are written.
    async fn merge_patch(&self, base: &Resource, object: &Resource) -> Result<Resource>;

    /// Delete one object.
    async fn delete(&self, kind: ObjectKind, key: &ObjectKey, options: &DeleteOptions)
    -> Result<()>;

    /// Delete every object of a kind in a namespace matching a selector.
    async fn delete_all_of(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
        options: &DeleteOptions,
    ) -> Result<()>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<Resource> {
        (**self).get(kind, key).await
    }

    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Resource>> {
        (**self).list(kind, namespace, selector).await
    }

    async fn create(&self, object: Resource) -> Result<Resource> {
        (**self).create(object).await
    }

    async fn update(&self, object: Resource) -> Result<Resource> {
        (**self).update(object).await
    }

    async fn merge_patch(&self, base: &Resource, object: &Resource) -> Result<Resource> {
        (**self).merge_patch(base, object).await
    }

    async fn delete(
        &self,
        kind: ObjectKind,
        key: &ObjectKey,
        options: &DeleteOptions,
    ) -> Result<()> {
        (**self).delete(kind, key, options).await
    }

    async fn delete_all_of(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
        options: &DeleteOptions,
    ) -> Result<()> {
        (**self)
            .delete_all_of(kind, namespace, selector, options)
            .await
    }
}

/// Typed convenience layer over any [`ObjectStore`].
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    /// Read one typed object.
    async fn fetch<T: Object>(&self, key: &ObjectKey) -> Result<T> {
        let resource = self.get(T::KIND, key).await?;
        Ok(T::from_resource(resource)?)
    }

    /// List typed objects.
    async fn list_objects<T: Object>(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<T>> {
        self.list(T::KIND, namespace, selector)
            .await?
            .into_iter()
            .map(|r| T::from_resource(r).map_err(Into::into))
            .collect()
    }

    /// Create a typed object.
    async fn create_object<T: Object>(&self, object: T) -> Result<T> {
        let created = self.create(object.into_resource()).await?;
        Ok(T::from_resource(created)?)
    }

    /// Replace a typed object.
    async fn update_object<T: Object>(&self, object: T) -> Result<T> {
        let updated = self.update(object.into_resource()).await?;
        Ok(T::from_resource(updated)?)
    }

    /// Merge-patch a typed object against a captured base.
    async fn patch_object<T: Object>(&self, base: &T, object: &T) -> Result<T> {
        let base = base.clone().into_resource();
        let object = object.clone().into_resource();
        let patched = self.merge_patch(&base, &object).await?;
        Ok(T::from_resource(patched)?)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

/// A wrapper that adds tracing to an object store.
pub struct TracingObjectStore<S: ObjectStore> {
    inner: S,
}

impl<S: ObjectStore> TracingObjectStore<S> {
    /// Create a new tracing object store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TracingObjectStore<S> {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<Resource> {
        tracing::debug!(%kind, %key, "Getting object");
        self.inner.get(kind, key).await
    }

    async fn list(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Resource>> {
        tracing::debug!(%kind, namespace, %selector, "Listing objects");
        let result = self.inner.list(kind, namespace, selector).await;
        if let Ok(ref items) = result {
            tracing::trace!(count = items.len(), "Objects listed");
        }
        result
    }

    async fn create(&self, object: Resource) -> Result<Resource> {
        tracing::debug!(kind = %object.kind(), key = %object.metadata().key(), "Creating object");
        self.inner.create(object).await
    }

    async fn update(&self, object: Resource) -> Result<Resource> {
        tracing::debug!(
            kind = %object.kind(),
            key = %object.metadata().key(),
            resource_version = object.metadata().resource_version,
            "Updating object"
        );
        self.inner.update(object).await
    }

    async fn merge_patch(&self, base: &Resource, object: &Resource) -> Result<Resource> {
        tracing::debug!(kind = %object.kind(), key = %object.metadata().key(), "Patching object");
        self.inner.merge_patch(base, object).await
    }

    async fn delete(
        &self,
        kind: ObjectKind,
        key: &ObjectKey,
        options: &DeleteOptions,
    ) -> Result<()> {
        tracing::debug!(%kind, %key, ?options, "Deleting object");
        self.inner.delete(kind, key, options).await
    }

    async fn delete_all_of(
        &self,
        kind: ObjectKind,
        namespace: &str,
        selector: &LabelSelector,
        options: &DeleteOptions,
    ) -> Result<()> {
        tracing::debug!(%kind, namespace, %selector, ?options, "Deleting all matching objects");
        self.inner
            .delete_all_of(kind, namespace, selector, options)
            .await
    }
}
