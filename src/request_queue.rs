//! Bounded, thread-safe FIFO of pending requests for a single unit.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::types::Request;

/// Why a push was refused. The request is handed back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum PushError {
    Full(Request),
    Closed(Request),
}

/// A synchronized FIFO with a fixed capacity and a close signal.
///
/// The same lock also guards `S`, state the owner keeps in step with the
/// queue contents (a unit keeps its position and direction here).
pub struct RequestQueue<S = ()> {
    inner: Mutex<RequestQueueState<S>>,
    available: Condvar,
    capacity: usize,
}

struct RequestQueueState<S> {
    queue: VecDeque<Request>,
    closed: bool,
    shared: S,
}

impl<S: Default> RequestQueue<S> {
    /// Create an empty queue holding at most `capacity` requests.
    pub fn new(capacity: usize) -> Self {
        Self::with_state(capacity, S::default())
    }
}

impl<S> RequestQueue<S> {
    pub fn with_state(capacity: usize, shared: S) -> Self {
        Self {
            inner: Mutex::new(RequestQueueState {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                shared,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append without blocking; refuses when full or closed.
    pub fn push(&self, request: Request) -> Result<(), PushError> {
        self.push_with(request, |_, _| {})
    }

    /// Like [`RequestQueue::push`], but runs `on_accept` under the lock before
    /// any consumer can see the request.
    pub fn push_with<F>(&self, request: Request, on_accept: F) -> Result<(), PushError>
    where
        F: FnOnce(&Request, &S),
    {
        let mut guard = self.inner.lock().expect("request queue mutex poisoned");
        if guard.closed {
            return Err(PushError::Closed(request));
        }
        if guard.queue.len() >= self.capacity {
            return Err(PushError::Full(request));
        }
        on_accept(&request, &guard.shared);
        guard.queue.push_back(request);
        self.available.notify_one();
        Ok(())
    }

    /// Try to pop immediately without blocking.
    pub fn try_pop(&self) -> Option<Request> {
        let mut guard = self.inner.lock().expect("request queue mutex poisoned");
        guard.queue.pop_front()
    }

    /// Block until a request is available, or until the queue is closed and drained.
    pub fn pop_blocking_or_closed(&self) -> Option<Request> {
        self.pop_blocking_with(|_, _| {})
    }

    /// Like [`RequestQueue::pop_blocking_or_closed`], but runs `on_pop` in the
    /// same critical section as the removal.
    pub fn pop_blocking_with<F>(&self, on_pop: F) -> Option<Request>
    where
        F: FnOnce(&Request, &mut S),
    {
        let mut guard = self.inner.lock().expect("request queue mutex poisoned");
        loop {
            if let Some(request) = guard.queue.pop_front() {
                on_pop(&request, &mut guard.shared);
                return Some(request);
            }
            if guard.closed {
                return None;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Read the pending count and shared state in one critical section.
    pub fn read<R>(&self, f: impl FnOnce(usize, &S) -> R) -> R {
        let guard = self.inner.lock().expect("request queue mutex poisoned");
        f(guard.queue.len(), &guard.shared)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.inner.lock().expect("request queue mutex poisoned");
        f(&mut guard.shared)
    }

    /// Refuse further pushes and wake all blocked consumers.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("request queue mutex poisoned");
        guard.closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("request queue mutex poisoned").closed
    }

    /// Current number of queued requests.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("request queue mutex poisoned");
        guard.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
