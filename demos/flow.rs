//! Reference scenario: integers 1..=10 flow through a to-string transform
//! into a printing sink, each stage pulling from the one before it.
//!
//! Run with: cargo run --example flow

use flowweld::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Request-driven pipeline ===");

    // the sink asks for 5 items up front, then one per item received;
    // the transform keeps exactly one item requested from the source
    let processor = MapProcessor::new(|n: i32| n.to_string());
    let sink = PrintSink::new().with_initial_demand(5);

    Pipeline::new(1..=10, processor).sink(sink).await?;

    println!("\n=== Empty input ===");

    let processor = MapProcessor::new(|n: i32| n.to_string());
    Pipeline::new(Vec::new(), processor)
        .sink(PrintSink::new())
        .await?;

    Ok(())
}
