//! dxfer: parallel direct-I/O copy of a file or block device
//!
//! Reads the source in aligned chunks with several reader tasks and writes
//! them out with as many writer tasks, skipping chunks that are all zero.

use anyhow::{Context, Result};
use clap::Parser;
use dxfer::cli::Args;
use dxfer::copy::copy_file;
use tracing::{info, Level};

#[compio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    if !args.quiet {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match args.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        // In quiet mode, only log errors
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Starting dxfer v{}", env!("CARGO_PKG_VERSION"));
    info!("Source: {}", args.source.display());
    info!("Destination: {}", args.destination.display());
    info!("Chunk size: {} KB", args.chunk_size_kb);
    info!("Max parallelism: {}", args.max_parallelism);
    info!("Direct I/O: {}", args.direct);

    // Validate arguments
    args.validate().context("Invalid arguments")?;

    let stats = copy_file(&args.source, &args.destination, &args.copy_settings())
        .await
        .with_context(|| {
            format!(
                "Failed to copy {} to {}",
                args.source.display(),
                args.destination.display()
            )
        })?;

    info!("Transfer completed successfully");
    info!("Bytes written: {}", stats.bytes_written);
    info!(
        "Chunks written: {}, skipped: {}",
        stats.chunks_written, stats.chunks_skipped
    );
    info!("Workers: {}", stats.pairs);
    info!("Duration: {:?}", stats.duration);
    info!("Throughput: {:.1} MiB/s", stats.throughput() / (1024.0 * 1024.0));
    Ok(())
}
