//! Cancellation for stream resolution
//!
//! An [`AbortSignal`] is shared between a stream handle and every network hop
//! that led to it. Aborting the signal cancels whatever is still in flight and
//! releases the byte stream.

use super::StreamError;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Called once when the signal is aborted, outside the signal's lock
pub(crate) type OnAbort = Box<dyn FnOnce() + Send>;

struct Bound {
    handle: AbortHandle,
    on_abort: Option<OnAbort>,
}

#[derive(Default)]
struct AbortState {
    aborted: bool,
    next_id: u64,
    bound: HashMap<u64, Bound>,
}

impl fmt::Debug for AbortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortState")
            .field("aborted", &self.aborted)
            .field("bound", &self.bound.len())
            .finish()
    }
}

/// Shared, cloneable cancellation signal
///
/// Clones refer to the same signal. Once aborted, a signal stays aborted:
/// futures and streams bound to it later are cancelled immediately.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    state: Arc<Mutex<AbortState>>,
}

/// Keeps a future or stream bound to its signal
///
/// Dropping it unbinds, so finished hops leave nothing behind on a
/// long-lived signal.
pub(crate) struct Binding {
    signal: AbortSignal,
    id: Option<u64>,
}

impl Drop for Binding {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.signal.state.lock().bound.remove(&id);
        }
    }
}

impl AbortSignal {
    /// Creates a signal that has not been aborted
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts everything bound to this signal
    ///
    /// Calling this more than once has no further effect.
    pub fn abort(&self) {
        let bound: Vec<Bound> = {
            let mut state = self.state.lock();
            if state.aborted {
                return;
            }
            state.aborted = true;
            state.bound.drain().map(|(_, bound)| bound).collect()
        };

        for Bound { handle, on_abort } in bound {
            handle.abort();
            if let Some(on_abort) = on_abort {
                on_abort();
            }
        }
    }

    /// Returns whether [`AbortSignal::abort`] has been called
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    /// Binds a new abortable future or stream to this signal
    ///
    /// `on_abort` runs when the signal is aborted while the binding is alive,
    /// or right away if the signal is already aborted.
    pub(crate) fn bind(&self, on_abort: Option<OnAbort>) -> (AbortRegistration, Binding) {
        let (handle, registration) = AbortHandle::new_pair();

        let mut state = self.state.lock();
        if state.aborted {
            drop(state);
            handle.abort();
            if let Some(on_abort) = on_abort {
                on_abort();
            }
            return (
                registration,
                Binding {
                    signal: self.clone(),
                    id: None,
                },
            );
        }

        let id = state.next_id;
        state.next_id += 1;
        state.bound.insert(id, Bound { handle, on_abort });

        (
            registration,
            Binding {
                signal: self.clone(),
                id: Some(id),
            },
        )
    }

    /// Runs a future until it completes or the signal is aborted
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Aborted` if the signal is aborted before the
    /// future completes, otherwise the future's own result.
    pub async fn run<F, T>(&self, future: F) -> Result<T, StreamError>
    where
        F: Future<Output = Result<T, StreamError>>,
    {
        let (registration, _binding) = self.bind(None);

        match Abortable::new(future, registration).await {
            Ok(result) => result,
            Err(_) => Err(StreamError::Aborted),
        }
    }

    #[cfg(test)]
    pub(crate) fn bound_count(&self) -> usize {
        self.state.lock().bound.len()
    }
}
