//! In-flight task handles.
//!
//! # Design
//! A `TaskHandle` owns the completion callback of one submitted request. The
//! callback sits in a slot that can be emptied once: whichever of the
//! transport worker (`complete`) or the caller (`cancel`) takes it first
//! delivers the outcome, and every later attempt is a no-op. This makes
//! "the callback runs at most once" a property of the type instead of a rule
//! every transport has to remember.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, trace};
use uuid::Uuid;

use crate::error::TransportError;
use crate::transport::{Completion, TransportOutcome};

/// Cloneable handle to one in-flight transport operation.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<TaskState>,
}

struct TaskState {
    id: Uuid,
    cancelled: AtomicBool,
    completion: Mutex<Option<Completion>>,
}

impl TaskHandle {
    /// Wrap a completion callback. Transports call this from `submit`.
    pub fn new(id: Uuid, completion: Completion) -> Self {
        Self {
            inner: Arc::new(TaskState {
                id,
                cancelled: AtomicBool::new(false),
                completion: Mutex::new(Some(completion)),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Deliver `outcome` to the completion callback.
    ///
    /// Returns `false` if the callback was already consumed, in which case
    /// `outcome` is dropped.
    pub fn complete(&self, outcome: TransportOutcome) -> bool {
        match self.take_completion() {
            Some(completion) => {
                completion(outcome);
                true
            }
            None => {
                trace!("task {}: late outcome discarded", self.inner.id);
                false
            }
        }
    }

    /// Ask the operation to stop.
    ///
    /// If the callback has not fired yet it is invoked immediately with
    /// `TransportError::Cancelled`, which unblocks whoever is waiting on it.
    /// Returns `true` if this call delivered the cancellation.
    ///
    /// The waiter is released at once, but the transport's own work is not
    /// guaranteed to stop. A transport blocked in I/O may hold its thread and
    /// connection until the request timeout fires, or indefinitely when the
    /// timeout is zero.
    pub fn cancel(&self) -> bool {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let delivered = self.complete(TransportOutcome::failed(TransportError::Cancelled));
        if delivered {
            debug!("task {}: cancelled", self.inner.id);
        }
        delivered
    }

    /// Transports poll this to skip work that nobody is waiting for.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// True once the completion callback has been consumed.
    pub fn is_finished(&self) -> bool {
        self.lock_slot().is_none()
    }

    fn take_completion(&self) -> Option<Completion> {
        // The guard is released before the callback runs.
        self.lock_slot().take()
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<Completion>> {
        self.inner
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
