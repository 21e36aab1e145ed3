//! Strata command-line tool
//!
//! Drives an engine against a backing file: `load` generates stream and
//! document traffic and reports throughput, `info` prints store counters.

use std::process;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use strata::collection::Transaction;
use strata::config::MapFailurePolicy;
use strata::schema::Schema;
use strata::{Config, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Strata storage engine tool
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Page-oriented storage engine for row streams and document collections")]
#[command(version)]
struct Args {
    /// Backing file
    #[arg(short, long, default_value = "./strata.db")]
    file: String,

    /// Page alignment in bytes (defaults to the file system block size)
    #[arg(short, long)]
    block_size: Option<u64>,

    /// Mapping growth unit in MB
    #[arg(long, default_value = "1")]
    mmap_mb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append rows and commit documents, then verify and report
    ///
    /// Exits non-zero if any stream reads back the wrong number of rows.
    Load {
        /// Number of streams written in parallel
        #[arg(short, long, default_value = "4")]
        streams: usize,

        /// Rows appended to each stream
        #[arg(short, long, default_value = "10000")]
        rows: usize,

        /// Payload size of each row in bytes
        #[arg(long, default_value = "64")]
        row_size: usize,

        /// Documents committed to the collection
        #[arg(short, long, default_value = "10000")]
        docs: usize,

        /// Documents per transaction
        #[arg(long, default_value = "100")]
        batch: usize,
    },

    /// Print page store counters for the backing file
    Info,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,strata=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Strata v{}", strata::VERSION);
    tracing::info!("Backing file: {}", args.file);

    let mut builder = Config::builder()
        .path(&args.file)
        .mmap_growth_unit(args.mmap_mb.max(1) * 1024 * 1024)
        .map_failure_policy(MapFailurePolicy::ReturnError);
    if let Some(block_size) = args.block_size {
        builder = builder.block_size(block_size);
    }
    let config = builder.build();

    let engine = match Engine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            process::exit(1);
        }
    };

    let outcome = match args.command {
        Commands::Load {
            streams,
            rows,
            row_size,
            docs,
            batch,
        } => run_load(&engine, streams, rows, row_size, docs, batch.max(1)),
        Commands::Info => {
            print_stats(&engine);
            Ok(0)
        }
    };

    match outcome {
        Ok(0) => {}
        Ok(mismatched) => {
            tracing::error!("{} streams failed verification", mismatched);
            process::exit(1);
        }
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            process::exit(1);
        }
    }

    if let Err(e) = engine.sync() {
        tracing::error!("Sync failed: {}", e);
        process::exit(1);
    }
}

fn run_load(
    engine: &Arc<Engine>,
    streams: usize,
    rows: usize,
    row_size: usize,
    docs: usize,
    batch: usize,
) -> Result<usize> {
    let payload = vec![0xA5u8; row_size];

    // Streams: one writer thread per stream
    let started = Instant::now();
    let results: Vec<Result<()>> = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..streams)
            .map(|i| {
                let engine = Arc::clone(engine);
                let payload = &payload;
                scope.spawn(move |_| -> Result<()> {
                    let key = format!("stream-{}", i);
                    for _ in 0..rows {
                        engine.append_row(&key, payload)?;
                    }
                    Ok(())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("stream writer panicked")))
            .collect()
    })
    .unwrap_or_else(|_| panic!("stream writer scope panicked"));

    for result in results {
        result?;
    }

    let elapsed = started.elapsed();
    let total_rows = (streams * rows) as f64;
    println!(
        "appended {} rows in {:.3}s ({:.0} rows/s)",
        streams * rows,
        elapsed.as_secs_f64(),
        total_rows / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    let mismatched = verify_streams(engine, streams, rows)?;

    // Documents: batched transactions
    let collection = engine.collection(Schema::new("load"))?;
    let started = Instant::now();
    let mut remaining = docs;
    let mut n = 0u64;
    while remaining > 0 {
        let mut tx = Transaction::new();
        for _ in 0..remaining.min(batch) {
            n += 1;
            tx.insert(format!("document {}", n).into_bytes());
        }
        remaining -= tx.len();
        collection.commit_transaction(tx)?;
    }
    collection.sync()?;

    let elapsed = started.elapsed();
    println!(
        "committed {} documents in {:.3}s ({:.0} docs/s), last key {}",
        docs,
        elapsed.as_secs_f64(),
        docs as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        collection.last_assigned_key()
    );

    print_stats(engine);
    Ok(mismatched)
}

/// Count the streams `stream-0..streams` that do not hold exactly `rows` rows
fn verify_streams(engine: &Engine, streams: usize, rows: usize) -> Result<usize> {
    let mut mismatched = 0;
    for i in 0..streams {
        let mut cursor = engine.get_cursor(&format!("stream-{}", i));
        let mut seen = 0;
        if cursor.seek_to_first()? {
            loop {
                seen += 1;
                if !cursor.next()? {
                    break;
                }
            }
        }
        if seen != rows {
            tracing::error!(stream = i, expected = rows, seen, "row count mismatch");
            mismatched += 1;
        }
    }
    Ok(mismatched)
}

fn print_stats(engine: &Engine) {
    let stats = engine.stats();
    println!("block size:    {}", stats.block_size);
    println!("end of store:  {}", stats.end_of_store);
    println!("file size:     {}", stats.file_size);
    println!("mapped size:   {}", stats.mapped_size);
    println!("free pages:    {} ({} bytes)", stats.free_pages, stats.free_bytes);
    println!("remaps:        {}", stats.remaps);
    println!("streams:       {}", engine.streams().stream_count());
}
