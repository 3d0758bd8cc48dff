//! # Thread-Safe Queue
//!
//! Unbounded MPMC queue with a shutdown switch, used to move decoded
//! surfaces from loader workers to the render thread.
//!
//! Results may arrive out of order. A consumer that needs one specific item
//! uses [`ThreadSafeQueue::wait_for_matching`], which puts every mismatch
//! back at the tail.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Result of a blocking pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopOutcome<T> {
    /// An item was dequeued.
    Item(T),
    /// The timeout expired with the queue still empty.
    TimedOut,
    /// The queue was shut down.
    Shutdown,
}

/// A shutdown-aware queue over a crossbeam channel.
#[derive(Debug)]
pub struct ThreadSafeQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    shutdown: AtomicBool,
}

impl<T> Default for ThreadSafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ThreadSafeQueue<T> {
    /// Poll interval used while waiting, so shutdown is noticed promptly.
    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Enqueues an item. Items pushed after shutdown are dropped.
    pub fn push(&self, item: T) {
        if self.is_shutdown() {
            return;
        }
        // Both ends live in `self`, the channel cannot be disconnected here.
        let _ = self.sender.send(item);
    }

    /// Dequeues an item if one is immediately available.
    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until an item arrives, the timeout expires or the queue shuts down.
    pub fn wait_and_pop(&self, timeout: Duration) -> PopOutcome<T> {
        let mut waited = Duration::ZERO;
        loop {
            if self.is_shutdown() {
                return PopOutcome::Shutdown;
            }
            if waited >= timeout {
                return PopOutcome::TimedOut;
            }

            let slice = Self::POLL_INTERVAL.min(timeout - waited);
            match self.receiver.recv_timeout(slice) {
                Ok(item) => return PopOutcome::Item(item),
                Err(RecvTimeoutError::Timeout) => waited += slice,
                Err(RecvTimeoutError::Disconnected) => return PopOutcome::Shutdown,
            }
        }
    }

    /// Blocks until an item satisfying `matches` is dequeued.
    ///
    /// Mismatching items are pushed back. Returns `None` once the queue is
    /// shut down.
    pub fn wait_for_matching(&self, mut matches: impl FnMut(&T) -> bool) -> Option<T> {
        loop {
            if self.is_shutdown() {
                return None;
            }

            match self.receiver.recv_timeout(Self::POLL_INTERVAL) {
                Ok(item) if matches(&item) => return Some(item),
                Ok(item) => {
                    let _ = self.sender.send(item);
                    std::thread::yield_now();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Stops the queue. Blocked waiters return, later pushes are ignored.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Returns true once [`shutdown`](Self::shutdown) was called.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_queue_fifo() {
        let queue = ThreadSafeQueue::new();
        queue.push(1);
        queue.push(2);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.wait_and_pop(Duration::from_millis(5)), PopOutcome::Item(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wait_and_pop_timeout() {
        let queue: ThreadSafeQueue<u8> = ThreadSafeQueue::new();
        assert_eq!(
            queue.wait_and_pop(Duration::from_millis(15)),
            PopOutcome::TimedOut
        );
    }

    #[test]
    fn test_shutdown_releases_waiters() {
        let queue: Arc<ThreadSafeQueue<u8>> = Arc::new(ThreadSafeQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_matching(|_| true))
        };

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();

        assert_eq!(waiter.join().unwrap(), None);
        queue.push(3);
        assert!(queue.is_empty());
        assert_eq!(
            queue.wait_and_pop(Duration::from_secs(1)),
            PopOutcome::Shutdown
        );
    }

    #[test]
    fn test_wait_for_matching_out_of_order() {
        let queue = ThreadSafeQueue::new();
        for id in [5_u64, 9, 7] {
            queue.push(id);
        }

        assert_eq!(queue.wait_for_matching(|&id| id == 7), Some(7));
        assert_eq!(queue.wait_for_matching(|&id| id == 5), Some(5));
        assert_eq!(queue.try_pop(), Some(9));
    }
}
