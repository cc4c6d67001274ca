//! Core traits for the publish/subscribe system.
//!
//! This module defines the fundamental abstractions of a request-driven
//! pipeline: publishers deliver items only against demand that subscribers
//! grant explicitly through their [`Subscription`].
//!
//! The protocol for one edge is:
//!
//! 1. `on_subscribe` is called once, before anything else.
//! 2. `on_next` is called at most once per unit of requested demand.
//! 3. Exactly one of `on_complete` or `on_error` ends the edge, unless the
//!    subscriber cancelled first.
//!
//! All callbacks for one subscriber run sequentially on a single task.

use async_trait::async_trait;

use crate::core::error::{Error, Result};
use crate::core::signal::CompletionSignal;
use crate::core::subscription::Subscription;
use crate::sources::SubmissionPublisher;

/// A subscriber receives items and terminal signals from one publisher.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use flowweld::core::{Result, Subscriber, Subscription};
///
/// struct Logger;
///
/// #[async_trait]
/// impl Subscriber for Logger {
///     type Item = String;
///
///     async fn on_subscribe(&mut self, subscription: &Subscription) {
///         subscription.request(1);
///     }
///
///     async fn on_next(&mut self, item: String, subscription: &Subscription) -> Result<()> {
///         println!("got {}", item);
///         subscription.request(1);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Subscriber: Send {
    /// The type of items this subscriber accepts
    type Item: Send + 'static;

    /// Called once when the edge is established. This is where the initial
    /// demand is requested.
    async fn on_subscribe(&mut self, subscription: &Subscription);

    /// Handle one item.
    ///
    /// Returning an error cancels the subscription; the same error is then
    /// passed to `on_error`.
    async fn on_next(&mut self, item: Self::Item, subscription: &Subscription) -> Result<()>;

    /// Called once when upstream failed.
    async fn on_error(&mut self, error: Error) {
        tracing::error!("error in processing! {}", error);
    }

    /// Called once when upstream finished and every item was delivered.
    async fn on_complete(&mut self) {}
}

/// A publisher delivers items to a subscriber against its demand.
pub trait Publisher {
    /// The type of items this publisher delivers
    type Item: Send + 'static;

    /// Attach a subscriber. Delivery happens on a task owned by the
    /// publisher; `on_subscribe` is its first callback.
    fn subscribe<S>(&self, subscriber: S) -> Result<()>
    where
        S: Subscriber<Item = Self::Item> + 'static;
}

/// A processor is a subscriber upstream and a publisher downstream.
///
/// Both halves name their item type `Item`; refer to them as
/// `<P as Subscriber>::Item` (input) and `<P as Publisher>::Item` (output).
pub trait Processor: Subscriber + Publisher {
    /// Handle to the publishing half.
    ///
    /// The processor itself moves into its upstream's delivery task when it
    /// subscribes, so whoever wires it keeps this handle to close it.
    fn outlet(&self) -> SubmissionPublisher<<Self as Publisher>::Item>;
}

/// A terminal subscriber that reports when its stream has ended.
pub trait Terminal {
    /// The signal released on completion (and, depending on the error
    /// policy, on failure)
    fn completion(&self) -> CompletionSignal;
}

/// What a stage does with an error it receives from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorPolicy {
    /// Log the error and pass it on as this stage's own terminal signal
    #[default]
    Propagate,
    /// Only log the error. Downstream never hears about the failure and a
    /// waiting terminal stage stays blocked.
    Log,
}
