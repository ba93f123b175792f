//! Completion tracking for backend operations.
//!
//! Each backend operation shares one [`OpCompletion`] with whoever waits on
//! it. The completion lives in its own heap allocation behind an `Arc`, so the
//! completing side never needs a pointer back into the operation that owns it.

use crate::error::{StorageError, StorageResult};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;

/// Callback invoked once with the final result code (0 or a negative errno).
///
/// The closure captures whatever caller context it needs.
pub type CompletionCallback = Box<dyn FnOnce(i32) + Send + 'static>;

enum State {
    Pending,
    /// Claimed by a completer whose callback is still running.
    Completing,
    Done(StorageResult<()>),
    Observed(i32),
}

/// Shared completion state of one backend operation.
pub struct OpCompletion {
    state: Mutex<State>,
    callback: Mutex<Option<CompletionCallback>>,
    cond: Condvar,
}

impl OpCompletion {
    /// Creates a pending completion with an optional callback.
    #[must_use]
    pub fn new(callback: Option<CompletionCallback>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::Pending),
            callback: Mutex::new(callback),
            cond: Condvar::new(),
        })
    }

    /// Records the final result of the operation.
    ///
    /// The callback, if any, runs before waiters are released. Completing an
    /// already completed operation is ignored.
    pub fn complete(&self, result: StorageResult<()>) {
        {
            let mut state = self.state.lock();
            if !matches!(*state, State::Pending) {
                tracing::warn!("operation completed twice, ignoring second result");
                return;
            }
            *state = State::Completing;
        }

        let code = match &result {
            Ok(()) => 0,
            Err(err) => err.code(),
        };
        if let Some(callback) = self.callback.lock().take() {
            callback(code);
        }

        let mut state = self.state.lock();
        *state = State::Done(result);
        self.cond.notify_all();
    }

    /// Returns true once the operation reached a terminal state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(*self.state.lock(), State::Done(_) | State::Observed(_))
    }

    /// Blocks until the operation completes and returns its result.
    ///
    /// The full error is handed out on the first call only. Later calls
    /// return an error carrying the same code.
    ///
    /// # Errors
    ///
    /// Returns the error the operation failed with.
    pub fn wait(&self) -> StorageResult<()> {
        let mut state = self.state.lock();
        while matches!(*state, State::Pending | State::Completing) {
            self.cond.wait(&mut state);
        }

        match std::mem::replace(&mut *state, State::Pending) {
            State::Done(result) => {
                *state = State::Observed(match &result {
                    Ok(()) => 0,
                    Err(err) => err.code(),
                });
                result
            }
            State::Observed(code) => {
                *state = State::Observed(code);
                if code == 0 {
                    Ok(())
                } else {
                    Err(StorageError::backend(code, "operation result already observed"))
                }
            }
            State::Pending | State::Completing => {
                unreachable!("loop exits only on a terminal state")
            }
        }
    }
}

impl fmt::Debug for OpCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            State::Pending | State::Completing => "pending",
            State::Done(Ok(())) | State::Observed(0) => "completed",
            State::Done(Err(_)) | State::Observed(_) => "failed",
        };
        f.debug_struct("OpCompletion").field("state", &state).finish()
    }
}
