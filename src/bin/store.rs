use std::{net::TcpListener, process, sync::Arc};

use clap::Parser;
use obsort::{cli::Verbosity, net, store::StoreHandle};
use tracing::error;

#[cfg(all(not(target_env = "msvc"), not(target_os = "macos")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Debug, Parser)]
#[clap(name = "store", about = "Oblivious shell sort store")]
struct Args {
    /// Configure logging.
    #[clap(flatten)]
    logging: Verbosity,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on for client connections.
    #[arg(short, long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    args.logging.setup_logging();

    let store = Arc::new(StoreHandle::default());

    let listener = match TcpListener::bind((args.host.as_str(), args.port)) {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}:{}: {e}", args.host, args.port);
            process::exit(1);
        }
    };

    if let Err(e) = net::serve(store, listener).await {
        error!("{e}");
        process::exit(1);
    }
}
