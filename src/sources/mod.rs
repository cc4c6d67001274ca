//! Source implementations for the flowweld library.
//!
//! The head of a pipeline is a [`SubmissionPublisher`]: callers push items in
//! with [`submit`](SubmissionPublisher::submit) or
//! [`offer`](SubmissionPublisher::offer), and a delivery task hands them to
//! the single subscriber as its demand allows.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore, TryAcquireError};

use crate::core::subscription::Upstream;
use crate::core::{
    Demand, Error, Publisher, Result, Subscriber, Subscription, SubscriptionId,
};

/// Buffer capacity used by [`SubmissionPublisher::new`]
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

enum Lifecycle {
    Open,
    Closed,
    Failed(Error),
}

/// The active subscriber's side of the shared state
struct Edge {
    id: SubscriptionId,
    demand: Demand,
    violation: Option<Error>,
    ready: Arc<Notify>,
}

struct State<T> {
    buffer: VecDeque<T>,
    lifecycle: Lifecycle,
    edge: Option<Edge>,
}

/// What the delivery task should do next
enum Signal<T> {
    Next(T),
    Complete,
    Error(Error),
    Idle,
    Detached,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// One permit per free buffer slot
    slots: Semaphore,
    capacity: usize,
    next_id: AtomicU64,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discard_buffer(&self, state: &mut State<T>) {
        let dropped = state.buffer.len();
        state.buffer.clear();
        self.slots.add_permits(dropped);
    }

    fn next_signal(&self, id: SubscriptionId) -> Signal<T> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let edge = match state.edge.as_mut() {
            Some(edge) if edge.id == id => edge,
            _ => return Signal::Detached,
        };

        if let Some(error) = edge.violation.take() {
            state.edge = None;
            self.discard_buffer(state);
            return Signal::Error(error);
        }

        if let Lifecycle::Failed(error) = &state.lifecycle {
            let error = error.clone();
            state.edge = None;
            return Signal::Error(error);
        }

        if edge.demand.is_positive() {
            if let Some(item) = state.buffer.pop_front() {
                edge.demand.consume_one();
                self.slots.add_permits(1);
                return Signal::Next(item);
            }
        }

        if state.buffer.is_empty() && matches!(state.lifecycle, Lifecycle::Closed) {
            state.edge = None;
            return Signal::Complete;
        }

        Signal::Idle
    }
}

impl<T: Send> Upstream for Shared<T> {
    fn request(&self, id: SubscriptionId, n: u64) {
        let mut state = self.lock();
        if let Some(edge) = state.edge.as_mut().filter(|edge| edge.id == id) {
            if n == 0 {
                edge.violation.get_or_insert(Error::InvalidDemand);
            } else {
                edge.demand.add(n);
            }
            tracing::trace!(subscription = %id, requested = n, demand = ?edge.demand, "demand");
            edge.ready.notify_one();
        }
    }

    fn cancel(&self, id: SubscriptionId) {
        let mut state = self.lock();
        if state.edge.as_ref().is_some_and(|edge| edge.id == id) {
            if let Some(edge) = state.edge.take() {
                edge.ready.notify_one();
            }
            self.discard_buffer(&mut state);
            tracing::debug!(subscription = %id, "subscription cancelled");
        }
    }
}

/// A publisher fed by explicit submissions.
///
/// Items are buffered in submission order, up to a fixed capacity, and
/// delivered to at most one subscriber at a time. Delivery never gets ahead
/// of the subscriber's requested demand.
///
/// `SubmissionPublisher` is a cheap handle; clones feed the same stream.
/// Subscribing requires a tokio runtime, which runs the delivery task.
pub struct SubmissionPublisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> SubmissionPublisher<T> {
    /// Create a publisher with the default buffer capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a publisher buffering at most `capacity` items.
    ///
    /// The capacity is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    buffer: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
                    lifecycle: Lifecycle::Open,
                    edge: None,
                }),
                slots: Semaphore::new(capacity),
                capacity,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Submit an item, waiting for buffer space if the buffer is full.
    ///
    /// Fails with `Error::Closed` once the publisher has been closed,
    /// including for callers still waiting for space at that moment.
    pub async fn submit(&self, item: T) -> Result<()> {
        let permit = self
            .shared
            .slots
            .acquire()
            .await
            .map_err(|_| Error::Closed)?;
        permit.forget();
        self.enqueue(item)
    }

    /// Submit an item without waiting.
    ///
    /// Fails with `Error::Capacity` when the buffer is full; the item is
    /// dropped.
    pub fn offer(&self, item: T) -> Result<()> {
        match self.shared.slots.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(TryAcquireError::Closed) => return Err(Error::Closed),
            Err(TryAcquireError::NoPermits) => {
                return Err(Error::capacity(self.buffered(), self.shared.capacity))
            }
        }
        self.enqueue(item)
    }

    fn enqueue(&self, item: T) -> Result<()> {
        let mut state = self.shared.lock();
        if !matches!(state.lifecycle, Lifecycle::Open) {
            return Err(Error::Closed);
        }
        state.buffer.push_back(item);
        if let Some(edge) = &state.edge {
            edge.ready.notify_one();
        }
        Ok(())
    }

    /// Finish the stream. Buffered items are still delivered, followed by
    /// `on_complete`. Has no effect on an already closed publisher.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        if matches!(state.lifecycle, Lifecycle::Open) {
            state.lifecycle = Lifecycle::Closed;
            self.shared.slots.close();
            if let Some(edge) = &state.edge {
                edge.ready.notify_one();
            }
            tracing::debug!(buffered = state.buffer.len(), "publisher closed");
        }
    }

    /// Fail the stream. Buffered items are dropped and the subscriber gets
    /// `on_error` without waiting for demand. Has no effect on an already
    /// closed publisher.
    pub fn close_exceptionally(&self, error: Error) {
        let mut state = self.shared.lock();
        if matches!(state.lifecycle, Lifecycle::Open) {
            tracing::debug!(%error, "publisher failed");
            state.lifecycle = Lifecycle::Failed(error);
            self.shared.slots.close();
            state.buffer.clear();
            if let Some(edge) = &state.edge {
                edge.ready.notify_one();
            }
        }
    }

    /// Whether `close` or `close_exceptionally` has been called
    pub fn is_closed(&self) -> bool {
        !matches!(self.shared.lock().lifecycle, Lifecycle::Open)
    }

    /// The error passed to `close_exceptionally`, if any
    pub fn closed_error(&self) -> Option<Error> {
        match &self.shared.lock().lifecycle {
            Lifecycle::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Whether a subscriber is currently attached
    pub fn has_subscriber(&self) -> bool {
        self.shared.lock().edge.is_some()
    }

    /// Number of items waiting for demand
    pub fn buffered(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    /// Maximum number of buffered items
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl<T: Send + 'static> Publisher for SubmissionPublisher<T> {
    type Item = T;

    /// Attach the single subscriber.
    ///
    /// Fails with `Error::AlreadySubscribed` while another subscriber is
    /// attached; the rejected subscriber is dropped without any callback.
    fn subscribe<S>(&self, subscriber: S) -> Result<()>
    where
        S: Subscriber<Item = T> + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::custom(format!("subscribe needs a tokio runtime: {}", e)))?;

        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let ready = Arc::new(Notify::new());
        {
            let mut state = self.shared.lock();
            if state.edge.is_some() {
                return Err(Error::AlreadySubscribed);
            }
            state.edge = Some(Edge {
                id,
                demand: Demand::NONE,
                violation: None,
                ready: ready.clone(),
            });
        }

        let subscription = Subscription::new(id, self.shared.clone());
        tracing::debug!(%subscription, "subscribed");
        runtime.spawn(deliver(self.shared.clone(), subscription, ready, subscriber));
        Ok(())
    }
}

impl<T: Send + 'static> Default for SubmissionPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubmissionPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Runs every callback of one subscriber, in order, on a single task.
async fn deliver<T, S>(
    shared: Arc<Shared<T>>,
    subscription: Subscription,
    ready: Arc<Notify>,
    mut subscriber: S,
) where
    T: Send + 'static,
    S: Subscriber<Item = T>,
{
    subscriber.on_subscribe(&subscription).await;

    loop {
        match shared.next_signal(subscription.id()) {
            Signal::Next(item) => {
                #[cfg(feature = "metrics")]
                metrics::counter!("flowweld_items_delivered_total").increment(1);

                if let Err(error) = subscriber.on_next(item, &subscription).await {
                    tracing::warn!(%subscription, %error, "subscriber failed, cancelling");
                    subscription.cancel();
                    subscriber.on_error(error).await;
                    break;
                }
            }
            Signal::Complete => {
                #[cfg(feature = "metrics")]
                metrics::counter!("flowweld_streams_completed_total").increment(1);

                tracing::debug!(%subscription, "complete");
                subscriber.on_complete().await;
                break;
            }
            Signal::Error(error) => {
                #[cfg(feature = "metrics")]
                metrics::counter!("flowweld_streams_failed_total").increment(1);

                tracing::debug!(%subscription, %error, "error");
                subscriber.on_error(error).await;
                break;
            }
            Signal::Detached => break,
            Signal::Idle => ready.notified().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn offer_fails_when_full() {
        let publisher = SubmissionPublisher::with_capacity(2);
        assert_ok!(publisher.offer(1));
        assert_ok!(publisher.offer(2));

        let err = publisher.offer(3).unwrap_err();
        assert!(matches!(err, Error::Capacity { current: 2, max: 2 }));
        assert_eq!(publisher.buffered(), 2);
    }

    #[test]
    fn capacity_is_clamped() {
        let publisher = SubmissionPublisher::<u8>::with_capacity(0);
        assert_eq!(publisher.capacity(), 1);
        assert_ok!(publisher.offer(7));

        let publisher = SubmissionPublisher::<u8>::with_capacity(usize::MAX);
        assert_eq!(publisher.capacity(), Semaphore::MAX_PERMITS);
        assert_ok!(publisher.offer(7));
        assert_eq!(publisher.buffered(), 1);
    }

    #[tokio::test]
    async fn submit_after_close_is_rejected() {
        let publisher = SubmissionPublisher::new();
        publisher.submit("a").await.unwrap();
        publisher.close();
        publisher.close();

        assert!(publisher.is_closed());
        assert!(matches!(publisher.submit("b").await, Err(Error::Closed)));
        assert!(matches!(publisher.offer("c"), Err(Error::Closed)));
        // buffered items survive a normal close
        assert_eq!(publisher.buffered(), 1);
    }

    #[tokio::test]
    async fn close_wakes_blocked_submitters() {
        let publisher = SubmissionPublisher::with_capacity(1);
        publisher.submit(1).await.unwrap();

        let blocked = {
            let publisher = publisher.clone();
            tokio::spawn(async move { publisher.submit(2).await })
        };
        tokio::task::yield_now().await;
        publisher.close();

        let result = blocked.await.unwrap();
        assert_err!(result);
    }

    #[test]
    fn close_exceptionally_drops_buffer_and_keeps_first_terminal_state() {
        let publisher = SubmissionPublisher::new();
        publisher.offer(1).unwrap();
        publisher.offer(2).unwrap();

        publisher.close_exceptionally(Error::custom("source broke"));
        publisher.close();

        assert_eq!(publisher.buffered(), 0);
        assert!(matches!(publisher.closed_error(), Some(Error::Custom(m)) if m == "source broke"));
    }

    #[test]
    fn subscribe_without_runtime_fails() {
        struct Noop;

        #[async_trait::async_trait]
        impl Subscriber for Noop {
            type Item = u8;
            async fn on_subscribe(&mut self, _: &Subscription) {}
            async fn on_next(&mut self, _: u8, _: &Subscription) -> Result<()> {
                Ok(())
            }
        }

        let publisher = SubmissionPublisher::<u8>::new();
        assert!(matches!(publisher.subscribe(Noop), Err(Error::Custom(_))));
        assert!(!publisher.has_subscriber());
    }
}
