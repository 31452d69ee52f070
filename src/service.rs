use chrono::Local;
use log::{error, info};
use std::path::PathBuf;

use crate::calculator::{ActivityInputs, SubmissionForm, SubmissionRecord, compute};
use crate::chart::{ChartOptions, ChartOutcome, render_chart};
use crate::config::AppConfig;
use crate::error::{LedgerError, ReportError, SubmitError, ValidationError};
use crate::ledger::{LedgerSnapshot, LedgerStore};
use crate::report;

/// Everything produced by one accepted submission
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub record: SubmissionRecord,
    pub chart: ChartOutcome,
    /// Path of the PDF report, if it could be written
    pub report: Option<PathBuf>,
    /// Non-fatal problems to show next to the result
    pub notices: Vec<String>,
}

/// Owns the ledger and artifact locations, and runs the submission pipeline
///
/// One service is shared by every request. The ledger store serializes
/// appends and reads; chart and report files are overwritten in place.
#[derive(Debug)]
pub struct FootprintService {
    config: AppConfig,
    ledger: LedgerStore,
    chart_options: ChartOptions,
}

impl FootprintService {
    /// Initializes the ledger and returns a service over `config`'s paths
    pub fn new(config: AppConfig) -> Result<Self, LedgerError> {
        let ledger = LedgerStore::open(&config.ledger_path)?;
        Ok(Self {
            config,
            ledger,
            chart_options: ChartOptions::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn compute(&self, inputs: &ActivityInputs) -> Result<SubmissionRecord, ValidationError> {
        compute(inputs)
    }

    pub fn append(&self, record: &SubmissionRecord) -> Result<(), LedgerError> {
        self.ledger.append(record)
    }

    pub fn load_all(&self) -> Result<LedgerSnapshot, LedgerError> {
        self.ledger.load_all()
    }

    /// Redraws the chart from the full ledger
    pub fn render_chart(&self) -> ChartOutcome {
        match self.ledger.load_all() {
            Ok(snapshot) => {
                render_chart(&snapshot, &self.config.chart_path(), &self.chart_options)
            }
            Err(e) => {
                error!("Error reading ledger for chart: {}", e);
                ChartOutcome::Failed(e.to_string())
            }
        }
    }

    /// Writes the PDF report for `record` against the current ledger and chart
    pub fn build_report(&self, record: &SubmissionRecord) -> Result<PathBuf, ReportError> {
        let ledger = self.ledger.load_all();
        self.write_report(record, &ledger)
    }

    fn write_report(
        &self,
        record: &SubmissionRecord,
        ledger: &Result<LedgerSnapshot, LedgerError>,
    ) -> Result<PathBuf, ReportError> {
        if let Err(e) = ledger {
            error!("Error reading ledger for report: {}", e);
        }
        report::build_report(
            record,
            ledger.as_ref(),
            &self.config.chart_path(),
            &self.config.report_dir,
            Local::now().date_naive(),
        )
    }

    /// Validates and records a form submission, then refreshes chart and report
    ///
    /// Validation failures and ledger write failures are returned as errors
    /// and nothing further happens. Once the record is appended, chart and
    /// report problems only add notices to the outcome.
    pub fn submit(&self, form: &SubmissionForm) -> Result<SubmissionOutcome, SubmitError> {
        let inputs = form.parse()?;
        let record = self.compute(&inputs)?;
        self.append(&record)?;
        info!(
            "Recorded {} ({}): {:.2} kg CO2",
            record.name, record.year, record.total_co2
        );

        let mut notices = Vec::new();

        let chart = self.render_chart();
        if let Some(notice) = chart.notice() {
            notices.push(notice);
        }

        let ledger = self.ledger.load_all();
        if let Err(e) = &ledger {
            notices.push(format!("Historical data could not be read: {}", e));
        }
        let report = match self.write_report(&record, &ledger) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(
                    "Error generating report for {} ({}): {}",
                    record.name, record.year, e
                );
                notices.push(format!("Report could not be generated: {}", e));
                None
            }
        };

        Ok(SubmissionOutcome {
            record,
            chart,
            report,
            notices,
        })
    }
}
