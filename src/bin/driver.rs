use std::process;

use clap::Parser;
use comfy_table::Table;
use obsort::{
    cipher::AesGcmCipher,
    cli::Verbosity,
    error::Error,
    net::HttpStoreClient,
    pipeline::{run_pipeline, PipelineConfig, PipelineReport},
};
use rand::thread_rng;
use tracing::error;

#[cfg(all(not(target_env = "msvc"), not(target_os = "macos")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Debug, Parser)]
#[clap(
    name = "driver",
    about = "Runs the full OBFI pipeline against an oblivious store: upload, hash generation, oblivious sort"
)]
struct Args {
    /// Configure logging.
    #[clap(flatten)]
    logging: Verbosity,

    /// Base URL of the store.
    #[arg(long, default_value = "http://localhost:3000")]
    store: String,

    /// Number of elements to generate and upload.
    #[arg(short = 's', long, default_value = "100")]
    elements: u32,

    /// Elements are drawn uniformly from [0, range).
    #[arg(short = 'n', long, default_value = "10000")]
    range: u32,

    /// Number of hash functions; derived from the false-positive rate when
    /// omitted.
    #[arg(short = 'k', long)]
    hash_functions: Option<u32>,

    /// Target Bloom false-positive rate.
    #[arg(short = 'p', long, default_value = "0.001")]
    fp_rate: f64,
}

async fn run(args: Args) -> Result<PipelineReport, Error> {
    let client = HttpStoreClient::new(&args.store)?;
    let cipher = AesGcmCipher::generate();
    let config = PipelineConfig {
        s: args.elements,
        range: args.range,
        k: args.hash_functions,
        fp_rate: args.fp_rate,
    };
    run_pipeline(client, cipher, config, &mut thread_rng()).await
}

fn summarize(report: &PipelineReport) -> Table {
    let head: Vec<String> = report.values.iter().take(16).map(u32::to_string).collect();

    let mut table = Table::new();
    table.set_header(["metric", "value"]);
    for (metric, value) in [
        ("bloom m", report.bloom.m.to_string()),
        ("bloom k", report.bloom.k.to_string()),
        ("array size", report.array_size.to_string()),
        ("sorted", report.sorted.to_string()),
        ("comparisons", report.comparisons.to_string()),
        ("writes", report.writes.to_string()),
        ("head", head.join(", ")),
    ] {
        table.add_row([metric.to_owned(), value]);
    }
    table
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    args.logging.setup_logging();

    match run(args).await {
        Ok(report) => {
            println!("{}", summarize(&report));
            if !report.sorted {
                // Negligible probability with the default schedule; rerun.
                error!("output is not sorted; rerun the pipeline");
                process::exit(2);
            }
        }
        Err(e) => {
            error!("pipeline failed: {e}");
            process::exit(1);
        }
    }
}
