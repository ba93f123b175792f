//! Open object handles.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::{resize, translate};
use dsal_storage::{BackendObject, ObjectId};
use std::fmt;

/// An object in the open state.
///
/// Binds the object identifier to its owning [`Store`] and to the backend's
/// open state. A handle is created by [`Store::open_object`] and destroyed by
/// [`ObjectHandle::close`]; a handle dropped without closing is closed with a
/// warning.
///
/// Concurrent delete of an open object is undefined at this layer; callers
/// serialize lifecycle calls on the same object.
pub struct ObjectHandle {
    oid: ObjectId,
    store: Store,
    state: Option<Box<dyn BackendObject>>,
}

impl ObjectHandle {
    pub(crate) fn new(oid: ObjectId, store: Store, state: Box<dyn BackendObject>) -> Self {
        Self {
            oid,
            store,
            state: Some(state),
        }
    }

    /// Returns the object identifier.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.oid
    }

    /// Returns the owning store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn backend_object(&self) -> CoreResult<&dyn BackendObject> {
        self.state
            .as_deref()
            .ok_or_else(|| CoreError::invalid_operation(format!("object {} is closed", self.oid)))
    }

    /// Queries the backend for the object's block size.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the size cannot be determined.
    pub fn block_size(&self) -> CoreResult<usize> {
        self.store.block_size(self.oid)
    }

    /// Writes `buf` at byte `offset`, using the backend block size.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see [`crate::write`].
    pub fn write(&self, offset: u64, buf: &[u8]) -> CoreResult<()> {
        translate::write(self, offset, self.block_size()?, buf)
    }

    /// Fills `buf` from byte `offset`, using the backend block size.
    ///
    /// Never-written ranges read as zeros.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see [`crate::read`].
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> CoreResult<()> {
        translate::read(self, offset, self.block_size()?, buf)
    }

    /// Changes the logical size from `old_size` to `new_size`.
    ///
    /// # Errors
    ///
    /// Returns the first failing zero-fill chunk's error; see
    /// [`crate::resize()`].
    pub fn resize(&self, old_size: u64, new_size: u64) -> CoreResult<()> {
        resize::resize(self, old_size, new_size)
    }

    /// Closes the handle.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the object cannot be released.
    pub fn close(mut self) -> CoreResult<()> {
        match self.state.take() {
            Some(state) => {
                state.close()?;
                tracing::debug!(oid = %self.oid, "closed object");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            tracing::warn!(oid = %self.oid, "object handle dropped without close");
            if let Err(err) = state.close() {
                tracing::error!(oid = %self.oid, error = %err, "failed to close object");
            }
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("oid", &self.oid)
            .field("open", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsal_storage::RequestCtx;

    #[test]
    fn handle_reports_identity() {
        let store = Store::open_in_memory().unwrap();
        let oid = store.create(&RequestCtx::default()).unwrap();
        let obj = store.open_object(oid).unwrap();
        assert_eq!(obj.id(), oid);
        assert_eq!(obj.block_size().unwrap(), 4096);
        obj.close().unwrap();
    }

    #[test]
    fn handle_byte_range_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let oid = store.create(&RequestCtx::default()).unwrap();
        let obj = store.open_object(oid).unwrap();

        obj.write(10, b"hello").unwrap();
        let mut out = [0u8; 20];
        obj.read(0, &mut out).unwrap();
        assert_eq!(&out[10..15], b"hello");
        assert!(out[..10].iter().all(|&b| b == 0));
        assert!(out[15..].iter().all(|&b| b == 0));
    }

    #[test]
    fn dropped_handle_is_closed() {
        let store = Store::open_in_memory().unwrap();
        let oid = store.create(&RequestCtx::default()).unwrap();
        drop(store.open_object(oid).unwrap());
        store.open_object(oid).unwrap().close().unwrap();
    }
}
