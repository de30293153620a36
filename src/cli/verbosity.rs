use clap::{ArgAction, Parser};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Logging flags shared by the binaries. `RUST_LOG` overrides the flags when
/// set.
#[derive(Debug, Parser)]
pub struct Verbosity {
    /// Silence all output
    #[clap(short, long, global = true)]
    quiet: bool,

    /// Verbose mode (-v, or -vv for even more verbose)
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

impl Verbosity {
    pub fn setup_logging(&self) {
        let filter = EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .from_env_lossy();
        tracing_subscriber::fmt().with_env_filter(filter).init();
        info!("logging setup complete");
    }

    fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::OFF
        } else {
            match self.verbose {
                0 => LevelFilter::INFO,
                1 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            }
        }
    }
}
