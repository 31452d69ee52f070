/*!
# Carbon Footprint Management

A small web application that estimates the yearly CO2-equivalent footprint of
an organisation or person from their activity data, built in Rust.

## Overview

Users submit monthly electricity, gas and fuel consumption, monthly waste and
the share of it that is recycled, and yearly business-travel distance with
the vehicle's fuel efficiency. Each submission is turned into a footprint
record, appended to a CSV ledger, charted against every past submission, and
summarized in a printable PDF report.

## Architecture

### Core
- **calculator**: Emission formulas, form parsing and input validation
- **ledger**: Append-only CSV store of submission records
- **chart**: Bar chart of every submission's total (plotters, PNG)
- **report**: Per-submission PDF report (lopdf)
- **export**: Ledger export to XLSX
- **service**: Owns the ledger and artifact paths; runs the submission pipeline

### Web Layer (feature `web`)
- **app**: Routing, handlers and templates (axum, handlebars)

## Submission Flow

1. The form is parsed and validated; invalid input is reported and nothing is stored
2. Energy, waste and travel emissions are computed and summed
3. The record is appended to the ledger
4. The chart is redrawn from the full ledger
5. The PDF report is rebuilt for the submitter and year

Chart and report problems never undo a stored submission; they are logged and
shown as notices next to the result.

## REST API Endpoints

- `/calculate` - Submission form and handler
- `/data` - All submissions as a table
- `/data/export.xlsx` - All submissions as an Excel workbook
- `/api/records` - All submissions as JSON
- `/graph` - Redraw and show the chart
- `/static/...`, `/reports/...` - Chart image and PDF reports
*/

pub mod calculator;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod ledger;
pub mod report;
pub mod service;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the most used items to make the crate easier to use
pub use calculator::{ActivityInputs, SubmissionForm, SubmissionRecord, compute};
pub use config::AppConfig;
pub use error::{LedgerError, ReportError, SubmitError, ValidationError};
pub use ledger::{LedgerRow, LedgerSnapshot, LedgerStore};
pub use service::{FootprintService, SubmissionOutcome};
