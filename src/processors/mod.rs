//! Processor implementations for the flowweld library.
//!
//! A processor sits between two publishers: it subscribes upstream, pulls one
//! item at a time, and republishes what it makes of each item through its own
//! [`SubmissionPublisher`].

use async_trait::async_trait;

use crate::core::{
    Error, ErrorPolicy, Processor, Publisher, Result, Subscriber, Subscription,
};
use crate::sources::SubmissionPublisher;

/// A processor that maps items using a function.
///
/// It keeps exactly one unit of demand outstanding upstream: one on
/// subscribe, then one more after each mapped item has been handed
/// downstream. When the downstream buffer is full the hand-off waits, which
/// stops the upstream pull as well.
pub struct MapProcessor<F, T, U> {
    f: F,
    outlet: SubmissionPublisher<U>,
    policy: ErrorPolicy,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<F, T, U> MapProcessor<F, T, U>
where
    F: FnMut(T) -> U + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    /// Create a new map processor
    pub fn new(f: F) -> Self {
        Self::with_outlet(f, SubmissionPublisher::new())
    }

    /// Create a map processor whose downstream buffer holds `capacity` items
    pub fn with_capacity(f: F, capacity: usize) -> Self {
        Self::with_outlet(f, SubmissionPublisher::with_capacity(capacity))
    }

    fn with_outlet(f: F, outlet: SubmissionPublisher<U>) -> Self {
        Self {
            f,
            outlet,
            policy: ErrorPolicy::default(),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Set what happens to errors arriving from upstream
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl<F, T, U> Subscriber for MapProcessor<F, T, U>
where
    F: FnMut(T) -> U + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    type Item = T;

    async fn on_subscribe(&mut self, subscription: &Subscription) {
        tracing::info!(%subscription, "transformer subscribed");
        subscription.request(1);
    }

    async fn on_next(&mut self, item: T, subscription: &Subscription) -> Result<()> {
        let mapped = (self.f)(item);
        self.outlet.submit(mapped).await?;
        subscription.request(1);
        Ok(())
    }

    async fn on_error(&mut self, error: Error) {
        tracing::error!("error in processing! {}", error);
        if self.policy == ErrorPolicy::Propagate {
            self.outlet.close_exceptionally(error);
        }
    }

    async fn on_complete(&mut self) {
        tracing::info!("transformer was closed");
        self.outlet.close();
    }
}

impl<F, T, U> Publisher for MapProcessor<F, T, U>
where
    U: Send + 'static,
{
    type Item = U;

    fn subscribe<S>(&self, subscriber: S) -> Result<()>
    where
        S: Subscriber<Item = U> + 'static,
    {
        self.outlet.subscribe(subscriber)
    }
}

impl<F, T, U> Processor for MapProcessor<F, T, U>
where
    F: FnMut(T) -> U + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    fn outlet(&self) -> SubmissionPublisher<U> {
        self.outlet.clone()
    }
}
