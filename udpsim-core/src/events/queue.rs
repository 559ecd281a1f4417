//! Blocking FIFO handoff between the ingress receiver and the processing actor.
//!
//! A single mutex/condition-variable pair guards the queue. `push` never
//! blocks; `pop_until` parks the consumer until an item arrives, an optional
//! deadline passes, or the queue is closed. Closing wakes every waiter and
//! no further items are handed out afterwards.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Pending queue is closed")]
    Closed,
}

/// Outcome of a deadline-bounded pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    Item(T),
    TimedOut,
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded multi-producer FIFO with a blocking consumer side.
pub struct PendingQueue<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Appends an item and wakes one waiting consumer.
    #[inline]
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.items.push_back(item);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until an item is available, `deadline` passes, or the queue is closed.
    pub fn pop_until(&self, deadline: Option<Instant>) -> Pop<T> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Pop::Closed;
            }
            if let Some(item) = state.items.pop_front() {
                return Pop::Item(item);
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        // A push or close may have raced the timeout.
                        if state.closed {
                            return Pop::Closed;
                        }
                        return match state.items.pop_front() {
                            Some(item) => Pop::Item(item),
                            None => Pop::TimedOut,
                        };
                    }
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    /// Non-blocking pop.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.items.pop_front()
    }

    /// Marks the queue closed and wakes all consumers. Idempotent.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
