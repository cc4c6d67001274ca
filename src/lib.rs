//! # Request-driven publish/subscribe pipelines for Rust
//!
//! This crate provides a reactive pipeline in which every stage pulls from
//! its upstream by requesting items explicitly, so no stage is ever handed
//! more than it asked for.
//!
//! ## Core Concepts
//!
//! - **Publisher**: Delivers items to one subscriber, never ahead of demand
//! - **Subscriber**: Receives items and requests more through its subscription
//! - **Processor**: Both at once; transforms items on their way downstream
//! - **Pipeline**: Wires source, processor and sink and waits for completion
//!
//! ## Example
//!
//! ```rust,no_run
//! use flowweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let processor = MapProcessor::new(|n: i32| n.to_string());
//!     let sink = PrintSink::new();
//!
//!     Pipeline::new(1..=10, processor).sink(sink).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod sinks;
pub mod sources;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::core::{
        CompletionSignal, Error, ErrorPolicy, Processor, Publisher, Result, Subscriber,
        Subscription, Terminal, Termination,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig};
    pub use crate::processors::MapProcessor;
    pub use crate::sinks::{CollectSink, PrintSink};
    pub use crate::sources::SubmissionPublisher;
}

// Re-export main error type
pub use crate::core::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
