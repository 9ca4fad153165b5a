pub mod capture;
pub mod cases;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod extract;
pub mod page;
pub mod render;
pub mod scan;
pub mod window;

use anyhow::Result;
use log::*;

pub async fn run(cli: cli::Cli) -> Result<()> {
    debug!("Running {:?}", cli.command);
    cli::execute(cli).await
}

/// Logger for tests and embedders that do not set up their own
pub fn init_logger() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp(None)
        .format_target(false)
        .is_test(true)
        .try_init();
}

// Re-export commonly used types
pub use cases::{collect_cases, Case};
pub use compose::{GeneratedCommand, GeneratedLink};
pub use config::Config;
pub use error::ScanError;
pub use page::{PageMode, PageSnapshot};
pub use scan::{ScanOutcome, Scanner};
pub use window::TimeWindow;
