use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Result of [`WorkQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    Queued,
    /// The queue was full (or closed) and the item was discarded.
    Dropped,
}

/// Result of [`WorkQueue::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Popped<T> {
    Item(T),
    /// Nothing arrived before the timeout.
    Empty,
}

/// Fixed-capacity FIFO shared between one producer and several consumers.
///
/// Pushing never waits: when the queue is full the new item is dropped.
/// Popping waits at most the given timeout so consumer loops stay
/// responsive.
pub struct WorkQueue<T> {
    tx: mpsc::Sender<T>,
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    name: &'static str,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            name: self.name,
        }
    }
}

impl<T: Send> WorkQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize, name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            name,
        }
    }

    /// Enqueue `item` without waiting.
    pub fn push(&self, item: T) -> Pushed {
        match self.tx.try_send(item) {
            Ok(()) => Pushed::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(queue = self.name, "queue full; dropping item");
                Pushed::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Pushed::Dropped,
        }
    }

    /// Take the oldest item, waiting up to `timeout`.
    pub async fn pop(&self, timeout: Duration) -> Popped<T> {
        let recv = async { self.rx.lock().await.recv().await };
        match tokio::time::timeout(timeout, recv).await {
            Ok(Some(item)) => Popped::Item(item),
            // the queue holds its own sender, so the channel never closes
            Ok(None) | Err(_) => Popped::Empty,
        }
    }

    /// Take the oldest item if one is ready right now.
    pub fn try_pop(&self) -> Popped<T> {
        let Ok(mut rx) = self.rx.try_lock() else {
            return Popped::Empty;
        };
        match rx.try_recv() {
            Ok(item) => Popped::Item(item),
            Err(_) => Popped::Empty,
        }
    }

    /// Number of items currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn overflow_keeps_first_capacity_items_in_order() {
        let q = WorkQueue::bounded(3, "test");
        let pushed: Vec<_> = (0..5).map(|i| q.push(i)).collect();
        assert_eq!(
            pushed,
            vec![
                Pushed::Queued,
                Pushed::Queued,
                Pushed::Queued,
                Pushed::Dropped,
                Pushed::Dropped
            ]
        );
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop(SHORT).await, Popped::Item(0));
        assert_eq!(q.pop(SHORT).await, Popped::Item(1));
        assert_eq!(q.pop(SHORT).await, Popped::Item(2));
        assert_eq!(q.pop(SHORT).await, Popped::Empty);
    }

    #[tokio::test]
    async fn pop_times_out_when_empty() {
        let q: WorkQueue<u8> = WorkQueue::bounded(1, "test");
        let start = std::time::Instant::now();
        assert_eq!(q.pop(SHORT).await, Popped::Empty);
        assert!(start.elapsed() >= SHORT);
    }

    #[tokio::test]
    async fn space_frees_after_pop() {
        let q = WorkQueue::bounded(1, "test");
        assert_eq!(q.push("a"), Pushed::Queued);
        assert_eq!(q.push("b"), Pushed::Dropped);
        assert_eq!(q.try_pop(), Popped::Item("a"));
        assert_eq!(q.push("c"), Pushed::Queued);
        assert!(!q.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_same_buffer() {
        let producer = WorkQueue::bounded(4, "test");
        let consumer = producer.clone();
        producer.push(7);
        assert_eq!(consumer.pop(SHORT).await, Popped::Item(7));
    }
}
