//! Core traits and types for the flowweld library.
//!
//! This module contains the protocol traits, the demand counter, the
//! subscription handle and the completion signal that every stage builds on.

pub mod demand;
pub mod error;
pub mod signal;
pub mod subscription;
pub mod traits;

// Re-export core items
pub use demand::Demand;
pub use error::{Error, Result};
pub use signal::{CompletionSignal, Termination};
pub use subscription::{Subscription, SubscriptionId};
pub use traits::{ErrorPolicy, Processor, Publisher, Subscriber, Terminal};
