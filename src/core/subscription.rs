//! Subscription handles connecting a subscriber to its publisher.

use std::fmt;
use std::sync::Arc;

/// Identifies one edge between a publisher and a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The publisher side of a subscription, as seen by the handle.
///
/// Both calls must be no-ops once the edge identified by `id` is no longer
/// active on the publisher.
pub(crate) trait Upstream: Send + Sync {
    fn request(&self, id: SubscriptionId, n: u64);
    fn cancel(&self, id: SubscriptionId);
}

/// Handle through which a subscriber controls delivery from its publisher.
///
/// A subscriber receives a reference to its subscription in every callback.
/// Clone it to request or cancel from somewhere else.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    upstream: Arc<dyn Upstream>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, upstream: Arc<dyn Upstream>) -> Self {
        Self { id, upstream }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Authorise the publisher to deliver `n` more items.
    ///
    /// `n == 0` is a protocol violation and terminates the subscription
    /// with `Error::InvalidDemand`. `u64::MAX` means unbounded demand.
    pub fn request(&self, n: u64) {
        self.upstream.request(self.id, n);
    }

    /// Stop delivery and drop any items buffered for this subscription.
    ///
    /// No further callbacks are made after the subscriber's current one
    /// returns.
    pub fn cancel(&self) {
        self.upstream.cancel(self.id);
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription#{}", self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
