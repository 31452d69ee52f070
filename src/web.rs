#![cfg(not(tarpaulin_include))]

use carbon_footprint::app;
use carbon_footprint::config::{self, AppConfig};
use clap::Parser;
use std::env;
use std::path::PathBuf;

/// Carbon footprint web application
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV ledger of all submissions
    #[arg(long, env = "CARBON_LEDGER", default_value = config::LEDGER_FILE)]
    ledger: PathBuf,

    /// Folder served under /static, holding the chart
    #[arg(long, env = "CARBON_STATIC_DIR", default_value = config::STATIC_DIR)]
    static_dir: PathBuf,

    /// Folder for generated PDF reports
    #[arg(long, env = "CARBON_REPORT_DIR", default_value = config::REPORTS_DIR)]
    report_dir: PathBuf,

    /// Address to listen on
    #[arg(long, env = "CARBON_BIND", default_value = config::BIND_ADDR)]
    bind: String,
}

/// Main entry point for the web application
///
/// Initializes logging, reads the artifact locations from the command line
/// or the environment, and serves the application until it is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "carbon_footprint=info,website=info");
        }
    }
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig {
        ledger_path: args.ledger,
        static_dir: args.static_dir,
        report_dir: args.report_dir,
        bind_addr: args.bind,
        ..AppConfig::default()
    };

    tokio::runtime::Runtime::new()?.block_on(app::run(config))
}
