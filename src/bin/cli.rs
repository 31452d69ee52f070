#![cfg(not(tarpaulin_include))]

use carbon_footprint::calculator::SubmissionForm;
use carbon_footprint::config::{self, AppConfig};
use carbon_footprint::service::FootprintService;
use carbon_footprint::{LedgerSnapshot, SubmitError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Record carbon footprints and inspect the ledger from the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// CSV ledger of all submissions
    #[arg(long, env = "CARBON_LEDGER", default_value = config::LEDGER_FILE)]
    ledger: PathBuf,

    /// Folder holding the chart
    #[arg(long, env = "CARBON_STATIC_DIR", default_value = config::STATIC_DIR)]
    static_dir: PathBuf,

    /// Folder for generated PDF reports
    #[arg(long, env = "CARBON_REPORT_DIR", default_value = config::REPORTS_DIR)]
    report_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute, record and report one submission. Quantities are monthly except travel.
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        electricity: Option<String>,
        #[arg(long)]
        gas: Option<String>,
        #[arg(long)]
        fuel: Option<String>,
        #[arg(long)]
        waste: Option<String>,
        /// Recycled share of the waste, 0 to 100
        #[arg(long)]
        recycling: Option<String>,
        #[arg(long)]
        kilometers: Option<String>,
        /// Distance per unit of fuel; must be above zero
        #[arg(long)]
        efficiency: Option<String>,
    },

    /// Print every ledger row
    List,

    /// Redraw the chart from the ledger
    Chart,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = AppConfig {
        ledger_path: cli.ledger,
        static_dir: cli.static_dir,
        report_dir: cli.report_dir,
        ..AppConfig::default()
    };
    let service = match FootprintService::new(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.cmd {
        Commands::Submit {
            name,
            year,
            electricity,
            gas,
            fuel,
            waste,
            recycling,
            kilometers,
            efficiency,
        } => {
            let form = SubmissionForm {
                name: Some(name),
                year: Some(year),
                electricity,
                gas,
                fuel,
                waste,
                recycling,
                kilometers,
                efficiency,
            };
            match service.submit(&form) {
                Ok(outcome) => {
                    let record = &outcome.record;
                    println!("Results for {} ({})", record.name, record.year);
                    println!("  Energy:  {:>10.2} kg CO2", record.electricity_co2);
                    println!("  Waste:   {:>10.2} kg CO2", record.waste_co2);
                    println!("  Travel:  {:>10.2} kg CO2", record.travel_co2);
                    println!("  Total:   {:>10.2} kg CO2", record.total_co2);
                    if let Some(report) = &outcome.report {
                        println!("Report: {}", report.display());
                    }
                    for notice in &outcome.notices {
                        eprintln!("Note: {}", notice);
                    }
                    ExitCode::SUCCESS
                }
                Err(SubmitError::Validation(e)) => {
                    eprintln!("Invalid input: {}", e);
                    ExitCode::from(2)
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Commands::List => match service.load_all() {
            Ok(LedgerSnapshot::NoData) => {
                println!("No data available yet.");
                ExitCode::SUCCESS
            }
            Ok(LedgerSnapshot::Rows(rows)) => {
                for row in rows {
                    let cell = |v: Option<f64>| {
                        v.map(|v| format!("{:.2}", v))
                            .unwrap_or_else(|| "-".to_string())
                    };
                    println!(
                        "{:<24} {:>6} {:>12} {:>12} {:>12} {:>12}",
                        row.name.as_deref().unwrap_or("-"),
                        row.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
                        cell(row.electricity_co2),
                        cell(row.waste_co2),
                        cell(row.travel_co2),
                        cell(row.total_co2),
                    );
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Chart => {
            let outcome = service.render_chart();
            match outcome.notice() {
                None => {
                    println!("Chart written to {}", service.config().chart_path().display());
                    ExitCode::SUCCESS
                }
                Some(notice) => {
                    eprintln!("{}", notice);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
