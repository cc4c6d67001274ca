//! Sink implementations for the flowweld library.
//!
//! Sinks are terminal subscribers. They request an initial batch of demand,
//! replenish it one item at a time, and release a [`CompletionSignal`] when
//! the stream ends.

use async_trait::async_trait;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::core::{
    CompletionSignal, Error, ErrorPolicy, Result, Subscriber, Subscription, Terminal,
    Termination,
};
use crate::util::type_tag;

/// Demand requested by a sink when it subscribes
pub const DEFAULT_INITIAL_DEMAND: u64 = 5;

/// Demand and termination handling shared by the sinks
struct TerminalState {
    initial_demand: u64,
    completion: CompletionSignal,
    policy: ErrorPolicy,
}

impl TerminalState {
    fn new() -> Self {
        Self {
            initial_demand: DEFAULT_INITIAL_DEMAND,
            completion: CompletionSignal::new(),
            policy: ErrorPolicy::default(),
        }
    }

    fn complete(&self) {
        if !self.completion.release(Termination::Completed) {
            tracing::debug!("completion signal already released");
        }
    }

    fn fail(&self, error: Error) {
        tracing::error!("error in processing! {}", error);
        if self.policy == ErrorPolicy::Propagate {
            self.completion.release(Termination::Failed(error));
        }
    }
}

/// A sink that prints items to stdout.
///
/// Each item is printed with the unqualified name of its type:
///
/// ```text
/// New item: 7. type: String
/// ```
pub struct PrintSink<T> {
    state: TerminalState,
    _phantom: PhantomData<fn(T)>,
}

impl<T> PrintSink<T> {
    /// Create a new print sink
    pub fn new() -> Self {
        Self {
            state: TerminalState::new(),
            _phantom: PhantomData,
        }
    }

    /// Set the batch of demand requested on subscribe (at least one)
    pub fn with_initial_demand(mut self, demand: u64) -> Self {
        self.state.initial_demand = demand.max(1);
        self
    }

    /// Set what happens to errors arriving from upstream
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.state.policy = policy;
        self
    }
}

impl<T: Display> PrintSink<T> {
    /// The line printed for `item`
    pub fn render(item: &T) -> String {
        format!("New item: {}. type: {}", item, type_tag::<T>())
    }
}

#[async_trait]
impl<T: Send + 'static + Display> Subscriber for PrintSink<T> {
    type Item = T;

    async fn on_subscribe(&mut self, subscription: &Subscription) {
        println!("new subscription: {}", subscription);
        subscription.request(self.state.initial_demand);
    }

    async fn on_next(&mut self, item: T, subscription: &Subscription) -> Result<()> {
        println!("{}", Self::render(&item));
        subscription.request(1);
        Ok(())
    }

    async fn on_error(&mut self, error: Error) {
        self.state.fail(error);
    }

    async fn on_complete(&mut self) {
        println!("subscriber was closed");
        self.state.complete();
    }
}

impl<T> Terminal for PrintSink<T> {
    fn completion(&self) -> CompletionSignal {
        self.state.completion.clone()
    }
}

impl<T> Default for PrintSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that collects items into a vector.
///
/// Requests demand the same way as [`PrintSink`].
pub struct CollectSink<T> {
    items: Arc<TokioMutex<Vec<T>>>,
    state: TerminalState,
}

impl<T: Send + 'static> CollectSink<T> {
    /// Create a new collect sink
    pub fn new() -> Self {
        Self {
            items: Arc::new(TokioMutex::new(Vec::new())),
            state: TerminalState::new(),
        }
    }

    /// Set the batch of demand requested on subscribe (at least one)
    pub fn with_initial_demand(mut self, demand: u64) -> Self {
        self.state.initial_demand = demand.max(1);
        self
    }

    /// Set what happens to errors arriving from upstream
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.state.policy = policy;
        self
    }

    /// Get a clone of the items Arc for external access
    pub fn items(&self) -> Arc<TokioMutex<Vec<T>>> {
        self.items.clone()
    }
}

#[async_trait]
impl<T: Send + 'static> Subscriber for CollectSink<T> {
    type Item = T;

    async fn on_subscribe(&mut self, subscription: &Subscription) {
        tracing::debug!(%subscription, "collector subscribed");
        subscription.request(self.state.initial_demand);
    }

    async fn on_next(&mut self, item: T, subscription: &Subscription) -> Result<()> {
        self.items.lock().await.push(item);
        subscription.request(1);
        Ok(())
    }

    async fn on_error(&mut self, error: Error) {
        self.state.fail(error);
    }

    async fn on_complete(&mut self) {
        self.state.complete();
    }
}

impl<T> Terminal for CollectSink<T> {
    fn completion(&self) -> CompletionSignal {
        self.state.completion.clone()
    }
}

impl<T: Send + 'static> Default for CollectSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subscription::Upstream;
    use crate::core::SubscriptionId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Requests(Mutex<Vec<u64>>);

    impl Upstream for Requests {
        fn request(&self, _: SubscriptionId, n: u64) {
            self.0.lock().unwrap().push(n);
        }

        fn cancel(&self, _: SubscriptionId) {}
    }

    fn recorded() -> (Arc<Requests>, Subscription) {
        let requests = Arc::new(Requests::default());
        let subscription = Subscription::new(SubscriptionId(1), requests.clone());
        (requests, subscription)
    }

    #[test]
    fn render_tags_the_item_type() {
        assert_eq!(PrintSink::render(&"3".to_string()), "New item: 3. type: String");
        assert_eq!(PrintSink::<i64>::render(&-1), "New item: -1. type: i64");
    }

    #[test]
    fn initial_demand_is_at_least_one() {
        let sink = CollectSink::<u8>::new().with_initial_demand(0);
        assert_eq!(sink.state.initial_demand, 1);
        assert_eq!(PrintSink::<u8>::new().state.initial_demand, DEFAULT_INITIAL_DEMAND);
    }

    #[test]
    fn completion_is_released_once() {
        let sink = CollectSink::<u8>::new();
        let signal = sink.completion();

        sink.state.complete();
        sink.state.fail(Error::Closed);
        sink.state.complete();

        assert!(signal.outcome().unwrap().is_completed());
    }

    #[test]
    fn log_policy_keeps_the_signal_unreleased() {
        let sink = PrintSink::<u8>::new().error_policy(ErrorPolicy::Log);
        let signal = sink.completion();

        sink.state.fail(Error::custom("upstream broke"));

        assert!(!signal.is_released());
    }

    #[tokio::test]
    async fn print_sink_requests_a_batch_then_one_per_item() {
        let (requests, subscription) = recorded();
        let mut sink = PrintSink::new();

        sink.on_subscribe(&subscription).await;
        for n in 1..=3 {
            sink.on_next(n.to_string(), &subscription).await.unwrap();
        }

        assert_eq!(*requests.0.lock().unwrap(), vec![5, 1, 1, 1]);
    }

    #[tokio::test]
    async fn collect_sink_requests_a_batch_then_one_per_item() {
        let (requests, subscription) = recorded();
        let mut sink = CollectSink::new().with_initial_demand(2);
        let items = sink.items();

        sink.on_subscribe(&subscription).await;
        sink.on_next(10, &subscription).await.unwrap();
        sink.on_next(20, &subscription).await.unwrap();

        assert_eq!(*requests.0.lock().unwrap(), vec![2, 1, 1]);
        assert_eq!(*items.lock().await, vec![10, 20]);
    }
}
