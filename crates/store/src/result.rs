//! Extension traits for store results.
//!
//! Reconcile handlers treat some store errors as outcomes rather than
//! failures: a missing object, or a create that lost a race. These
//! combinators express that without matching on every call site.

use crate::error::{Result, StoreError};

/// Combinators over [`Result`] for the outcome-like store errors.
pub trait StoreResultExt<T> {
    /// Map `NotFound` to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates every other error.
    fn not_found_as_none(self) -> Result<Option<T>>;

    /// Map `NotFound` to `Ok(())`, discarding the value.
    ///
    /// # Errors
    ///
    /// Propagates every other error.
    fn ignore_not_found(self) -> Result<()>;

    /// Map `AlreadyExists` to `Ok(None)`; a concurrent creator won.
    ///
    /// # Errors
    ///
    /// Propagates every other error.
    fn already_exists_as_none(self) -> Result<Option<T>>;

    /// Inspect the error without consuming the Result.
    #[must_use]
    fn inspect_store_error<F: FnOnce(&StoreError)>(self, f: F) -> Self;
}

impl<T> StoreResultExt<T> for Result<T> {
    fn not_found_as_none(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Result<()> {
        self.not_found_as_none().map(|_| ())
    }

    fn already_exists_as_none(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_already_exists() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn inspect_store_error<F: FnOnce(&StoreError)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::{ObjectKey, ObjectKind};

    fn not_found() -> StoreError {
        StoreError::not_found(ObjectKind::Pod, &ObjectKey::new("ns", "p"))
    }

    #[test]
    fn test_not_found_as_none() {
        let missing: Result<i32> = Err(not_found());
        assert_eq!(missing.not_found_as_none(), Ok(None));

        let found: Result<i32> = Ok(1);
        assert_eq!(found.not_found_as_none(), Ok(Some(1)));

        let failed: Result<i32> = Err(StoreError::backend("get", "timeout"));
        assert!(failed.not_found_as_none().is_err());
    }

    #[test]
    fn test_already_exists_as_none() {
        let raced: Result<i32> =
            Err(StoreError::already_exists(ObjectKind::Pod, &ObjectKey::new("ns", "p")));
        assert_eq!(raced.already_exists_as_none(), Ok(None));

        let missing: Result<i32> = Err(not_found());
        assert!(missing.already_exists_as_none().is_err());
    }

    #[test]
    fn test_inspect_store_error() {
        let mut seen = false;
        let result: Result<i32> = Err(not_found());
        let result = result.inspect_store_error(|_| seen = true);
        assert!(seen);
        assert!(result.is_err());
    }
}
