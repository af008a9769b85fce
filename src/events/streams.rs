use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, trace};

/// Events that can report a short label for per-type statistics
pub trait EventLabel {
    fn label(&self) -> &'static str;
}

/// Broadcast stream with a bounded replay buffer
pub struct EventStream<T: Clone + Send + 'static> {
    sender: broadcast::Sender<T>,
    buffer: Arc<RwLock<VecDeque<T>>>,
    buffer_size: usize,
    stats: Arc<RwLock<EventStreamStats>>,
}

/// Statistics for monitoring stream activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStreamStats {
    pub events_published: u64,
    /// Events published while nobody was subscribed; they are still buffered
    pub events_unobserved: u64,
    pub type_counts: HashMap<String, u64>,
}

impl<T: Clone + Send + Sync + EventLabel + 'static> EventStream<T> {
    /// Create a new event stream with specified capacity
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        debug!(capacity, buffer_size, "Creating event stream");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(buffer_size))),
            buffer_size,
            stats: Arc::new(RwLock::new(EventStreamStats::default())),
        }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> Subscriber<T> {
        trace!("New subscriber registered to event stream");
        Subscriber {
            receiver: self.sender.subscribe(),
            buffer: Arc::clone(&self.buffer),
        }
    }

    /// Publish an event, returning how many live subscribers received it.
    /// Having no subscribers is not an error.
    pub async fn publish(&self, event: T) -> usize {
        let label = event.label();
        let delivered = self.sender.send(event.clone()).unwrap_or(0);

        self.buffer_event(event).await;

        let mut stats = self.stats.write().await;
        stats.events_published += 1;
        if delivered == 0 {
            stats.events_unobserved += 1;
        }
        *stats.type_counts.entry(label.to_string()).or_insert(0) += 1;

        trace!(receivers = delivered, event = label, "Event published");
        delivered
    }

    async fn buffer_event(&self, event: T) {
        let mut buffer = self.buffer.write().await;
        buffer.push_back(event);

        while buffer.len() > self.buffer_size {
            buffer.pop_front();
        }
    }

    /// Get current statistics
    pub async fn get_stats(&self) -> EventStreamStats {
        self.stats.read().await.clone()
    }

    /// Reset statistics counters
    pub async fn reset_stats(&self) {
        *self.stats.write().await = EventStreamStats::default();
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.buffer_size
    }
}

/// Subscriber for receiving events from a stream
pub struct Subscriber<T: Clone + Send + 'static> {
    receiver: broadcast::Receiver<T>,
    buffer: Arc<RwLock<VecDeque<T>>>,
}

impl<T: Clone + Send + 'static> Subscriber<T> {
    /// Receive the next event
    pub async fn recv(&mut self) -> Result<T, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already waiting
    pub fn try_recv(&mut self) -> Result<T, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Events still held in the replay buffer, oldest first
    pub async fn replay_buffer(&self) -> Vec<T> {
        self.buffer.read().await.iter().cloned().collect()
    }
}

impl<T: Clone + Send + 'static> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            buffer: Arc::clone(&self.buffer),
            buffer_size: self.buffer_size,
            stats: Arc::clone(&self.stats),
        }
    }
}
