//! The system bus defines an embedded pubsub architecture in which
//! consumers may subscribe to a topic and producers may publish to the topics
//! with broadcast semantics
//!
//! The implementation of the bus is such that if there are no subscribers to
//! a given topic; a publish action is a no-op. Consequently, a new subscriber
//! will not see historical messages

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::{
    collections::HashMap,
    pin::Pin,
    sync::mpsc::TryRecvError,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    task::{Context, Poll},
};

use bus::{Bus, BusReader};
use common::Shared;
use futures::Stream;

/// The number of messages to buffer inside a single topic's bus
const BUS_BUFFER_SIZE: usize = 10;

/// A type alias for the topic level shared bus mesh
type TopicMesh<M> = Shared<HashMap<String, Shared<TopicFabric<M>>>>;

// ----------------
// | Topic Reader |
// ----------------

/// A wrapper around `BusReader` that builds pollable methods around reading
///
/// Reads never block; a pending read re-registers its waker and yields to the
/// async runtime until a message is enqueued on the topic
pub struct TopicReader<M> {
    /// The underlying bus reader for the topic's bus
    reader: BusReader<M>,
}

impl<M: Clone + Sync> TopicReader<M> {
    /// Construct a new reader for a topic
    fn new(bus_reader: BusReader<M>) -> Self {
        Self { reader: bus_reader }
    }

    /// Await the next message published on the topic
    pub async fn next_message(&mut self) -> M {
        futures::future::poll_fn(|cx| self.poll_message(cx)).await
    }

    /// Poll the underlying reader once, scheduling a wake if no message is
    /// ready
    fn poll_message(&mut self, cx: &mut Context<'_>) -> Poll<M> {
        match self.reader.try_recv() {
            Ok(message) => Poll::Ready(message),
            Err(_) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            },
        }
    }
}

impl<M: Clone + Sync> Stream for TopicReader<M> {
    type Item = M;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.reader.try_recv() {
            Ok(message) => Poll::Ready(Some(message)),
            Err(TryRecvError::Empty) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            },
            Err(TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}

// ----------------
// | Topic Fabric |
// ----------------

/// An implementation of a single-producer, multi-consumer topic specific bus
struct TopicFabric<M> {
    /// The broadcast primitive underlying a shared bus
    bus: Bus<M>,
}

impl<M: Clone + Sync> TopicFabric<M> {
    /// Construct a new fabric for a registered topic
    fn new() -> Self {
        Self { bus: Bus::new(BUS_BUFFER_SIZE) }
    }

    /// Add a new reader to the fabric
    fn new_reader(&mut self) -> TopicReader<M> {
        TopicReader::new(self.bus.add_rx())
    }

    /// Write a message onto the topic bus
    fn write_message(&mut self, message: M) {
        self.bus.broadcast(message)
    }
}

// --------------
// | System Bus |
// --------------

/// The system bus abstracts over an embedded pubsub functionality
///
/// Note that publishing to a topic with no subscribers is a no-op
pub struct SystemBus<M> {
    /// The topic mesh connects publishers to subscribers, it is concretely
    /// implemented as a mapping from topic name to a bus (single-producer,
    /// multi-consumer)
    topic_mesh: TopicMesh<M>,
}

impl<M> Clone for SystemBus<M> {
    fn clone(&self) -> Self {
        Self { topic_mesh: self.topic_mesh.clone() }
    }
}

impl<M: Clone + Sync> Default for SystemBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + Sync> SystemBus<M> {
    /// Construct a new system bus
    pub fn new() -> Self {
        Self { topic_mesh: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Acquire a read lock on the topic mesh
    fn read_topic_mesh(&self) -> RwLockReadGuard<'_, HashMap<String, Shared<TopicFabric<M>>>> {
        self.topic_mesh.read().expect("topic_mesh lock poisoned")
    }

    /// Acquire a write lock on the topic mesh
    fn write_topic_mesh(&self) -> RwLockWriteGuard<'_, HashMap<String, Shared<TopicFabric<M>>>> {
        self.topic_mesh.write().expect("topic_mesh lock poisoned")
    }

    /// Publish a message onto a topic; blocks if the topic buffer is full
    pub fn publish(&self, topic: String, message: M) {
        let locked_mesh = self.read_topic_mesh();
        let topic_entry = locked_mesh.get(&topic);

        // If the topic is not registered, there are no listeners, short circuit
        if topic_entry.is_none() {
            return;
        }

        // Otherwise, lock the topic and push a message onto it
        let mut locked_topic =
            topic_entry.unwrap().write().expect("topic_entry lock poisoned");
        locked_topic.write_message(message)
    }

    /// Subscribe to a topic, returning a pollable reader
    pub fn subscribe(&self, topic: String) -> TopicReader<M> {
        // If the topic is not yet registered, create one
        let contains_topic = { self.read_topic_mesh().contains_key(&topic) };
        if !contains_topic {
            let mut locked_mesh = self.write_topic_mesh();
            locked_mesh.entry(topic.clone()).or_insert_with(|| {
                Arc::new(RwLock::new(TopicFabric::new()))
            });
        } // locked_mesh released

        // Build a reader on the topic of interest and return it as a pollable
        // to the subscriber
        let locked_mesh = self.read_topic_mesh();
        let mut locked_topic =
            locked_mesh.get(&topic).unwrap().write().expect("topic_entry lock poisoned");
        locked_topic.new_reader()
    }

    /// Returns whether or not the given topic has been subscribed to by any
    /// readers
    pub fn has_listeners(&self, topic: &str) -> bool {
        self.read_topic_mesh().contains_key(topic)
    }
}
