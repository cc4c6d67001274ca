//! Pipeline orchestration and execution.
//!
//! This module wires a source, a processor and a sink into one linear,
//! request-driven pipeline, feeds it, and waits for the sink to report that
//! the stream has ended.

use futures_core::Stream;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::StreamExt;

use crate::core::{Error, Processor, Publisher, Result, Subscriber, Terminal, Termination};
use crate::sources::{SubmissionPublisher, DEFAULT_BUFFER_CAPACITY};

type InputStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Configuration for pipeline execution
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Maximum number of items the source buffers ahead of demand
    pub buffer_capacity: usize,
    /// Maximum time to wait for the sink to release its completion signal.
    /// `None` waits until the stream ends.
    pub completion_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            completion_timeout: None,
        }
    }
}

/// A pipeline feeds a fixed input sequence through a processor into a sink.
///
/// ```rust,no_run
/// use flowweld::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let processor = MapProcessor::new(|n: i32| n.to_string());
///
///     Pipeline::new(1..=10, processor)
///         .buffer_capacity(16)
///         .sink(PrintSink::new())
///         .await
/// }
/// ```
pub struct Pipeline<R: Subscriber> {
    inputs: InputStream<R::Item>,
    processor: R,
    config: PipelineConfig,
}

impl<R> Pipeline<R>
where
    R: Processor + 'static,
{
    /// Create a pipeline over the items of an iterator
    pub fn new<I>(inputs: I, processor: R) -> Self
    where
        I: IntoIterator<Item = <R as Subscriber>::Item>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(tokio_stream::iter(inputs), processor)
    }

    /// Create a pipeline over the items of a stream
    pub fn from_stream<S>(inputs: S, processor: R) -> Self
    where
        S: Stream<Item = <R as Subscriber>::Item> + Send + 'static,
    {
        Self {
            inputs: Box::pin(inputs),
            processor,
            config: PipelineConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the source buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Bound the wait for the sink to finish
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout = Some(timeout);
        self
    }

    /// Run the pipeline into a sink.
    ///
    /// Returns once the sink's completion signal fires: `Ok(())` when the
    /// stream completed and the stream's error when it failed. With a
    /// completion timeout set, `Error::Timeout` when the signal did not fire
    /// in time; without one the wait is unbounded.
    pub async fn sink<C>(self, sink: C) -> Result<()>
    where
        C: Subscriber<Item = <R as Publisher>::Item> + Terminal + 'static,
    {
        let Pipeline {
            mut inputs,
            processor,
            config,
        } = self;

        let completion = sink.completion();
        let outlet = processor.outlet();
        let source = SubmissionPublisher::with_capacity(config.buffer_capacity);

        processor.subscribe(sink)?;
        source.subscribe(processor)?;

        let run = async {
            tokio::select! {
                fed = feed(&mut inputs, &source) => fed?,
                // the stream can only end early by failing
                outcome = completion.wait() => {
                    tracing::warn!("pipeline terminated before all input was submitted");
                    return Ok(outcome);
                }
            }
            Ok::<Termination, Error>(completion.wait().await)
        };

        let outcome = match config.completion_timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| limit),
            None => Ok(run.await),
        };

        source.close();
        outlet.close();

        let termination = match outcome {
            Ok(result) => result?,
            Err(limit) => {
                let timeout_ms = limit.as_millis() as u64;
                tracing::error!(timeout_ms, "pipeline did not complete in time");
                return Err(Error::timeout(timeout_ms));
            }
        };

        tracing::info!(?termination, "pipeline finished");
        termination.into_result()
    }
}

async fn feed<T: Send + 'static>(
    inputs: &mut InputStream<T>,
    source: &SubmissionPublisher<T>,
) -> Result<()> {
    while let Some(item) = inputs.next().await {
        source.submit(item).await?;
    }
    source.close();
    Ok(())
}
