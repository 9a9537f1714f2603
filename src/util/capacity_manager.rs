//! Concurrency limiting via capacity management.
//!
//! A single [`CapacityManager`] is shared by local hashing work and remote
//! uploads so that one constant bounds both open file handles and in-flight
//! store requests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

// =============================================================================
// UsedCapacity
// =============================================================================

/// A handle representing capacity that has been reserved.
///
/// When this is dropped, the capacity is automatically returned to the
/// [`CapacityManager`]. This ensures capacity is never leaked, even when a
/// task exits early through `?`.
pub struct UsedCapacity {
    amount: u64,
    inner: Arc<Inner>,
}

impl UsedCapacity {
    /// Returns the amount of capacity this handle represents.
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl Drop for UsedCapacity {
    fn drop(&mut self) {
        if self.amount > 0 {
            self.inner.release(self.amount);
        }
    }
}

// =============================================================================
// Internal State
// =============================================================================

/// A request queued behind the limit.
struct Waiter {
    amount: u64,
    sender: oneshot::Sender<()>,
}

struct Inner {
    state: Mutex<State>,
}

struct State {
    limit: u64,
    used: u64,
    waiters: VecDeque<Waiter>,
}

impl Inner {
    fn new(limit: u64) -> Self {
        Self {
            state: Mutex::new(State {
                limit,
                used: 0,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Try to reserve capacity immediately, returns None if we need to wait.
    fn try_use(&self, amount: u64) -> Option<()> {
        let mut state = self.state.lock().unwrap();
        if state.used + amount <= state.limit {
            state.used += amount;
            Some(())
        } else {
            None
        }
    }

    /// Add a waiter to the queue.
    fn add_waiter(&self, amount: u64) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        state.waiters.push_back(Waiter { amount, sender });
        receiver
    }

    /// Return capacity and wake queued waiters in FIFO order while they fit.
    fn release(&self, amount: u64) {
        let mut state = self.state.lock().unwrap();
        state.used = state.used.saturating_sub(amount);

        while let Some(waiter) = state.waiters.front() {
            if state.used + waiter.amount <= state.limit {
                state.used += waiter.amount;
                let waiter = state.waiters.pop_front().unwrap();
                // Ignore send errors - receiver may have been dropped
                let _ = waiter.sender.send(());
            } else {
                break;
            }
        }
    }
}

// =============================================================================
// CapacityManager
// =============================================================================

/// Tracks resource usage against a configured limit.
///
/// When capacity is exhausted, requests to
/// [`use_capacity`](Self::use_capacity) wait until capacity becomes
/// available. Clones share the same underlying state.
#[derive(Clone)]
pub struct CapacityManager {
    inner: Arc<Inner>,
}

impl CapacityManager {
    /// Create a new CapacityManager with the given limit.
    pub fn new(limit: u64) -> Self {
        Self {
            inner: Arc::new(Inner::new(limit)),
        }
    }

    /// Request capacity.
    ///
    /// If sufficient capacity is available, this returns immediately.
    /// Otherwise, the request is queued and this waits until capacity
    /// becomes available.
    ///
    /// The returned [`UsedCapacity`] handle automatically returns the
    /// capacity when dropped.
    pub async fn use_capacity(&self, amount: u64) -> UsedCapacity {
        if self.inner.try_use(amount).is_some() {
            return UsedCapacity {
                amount,
                inner: Arc::clone(&self.inner),
            };
        }

        let receiver = self.inner.add_waiter(amount);

        // Ignore errors - a dropped sender means the manager is gone
        let _ = receiver.await;

        UsedCapacity {
            amount,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the current amount of capacity in use.
    pub fn used(&self) -> u64 {
        self.inner.state.lock().unwrap().used
    }

    /// Returns the configured limit.
    pub fn limit(&self) -> u64 {
        self.inner.state.lock().unwrap().limit
    }

    /// Returns the number of requests currently waiting for capacity.
    pub fn waiting_count(&self) -> usize {
        self.inner.state.lock().unwrap().waiters.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
