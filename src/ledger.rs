use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{info, warn};
use serde::Serialize;
use std::fs::{OpenOptions, create_dir_all, metadata};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::calculator::SubmissionRecord;
use crate::error::LedgerError;

/// Fixed column schema of the ledger file, in column order
pub const LEDGER_HEADER: [&str; 6] = [
    "Name",
    "Year",
    "Electricity (kg CO2)",
    "Waste (kg CO2)",
    "Travel (kg CO2)",
    "Total (kg CO2)",
];

/// One ledger row as read back from disk
///
/// Cells that are blank or do not parse as their column type are `None`.
/// Use [`LedgerRow::to_record`] to keep only fully valid rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub electricity_co2: Option<f64>,
    pub waste_co2: Option<f64>,
    pub travel_co2: Option<f64>,
    pub total_co2: Option<f64>,
}

impl LedgerRow {
    /// The complete record, or `None` if any cell is missing
    pub fn to_record(&self) -> Option<SubmissionRecord> {
        Some(SubmissionRecord {
            name: self.name.clone()?,
            year: self.year?,
            electricity_co2: self.electricity_co2?,
            waste_co2: self.waste_co2?,
            travel_co2: self.travel_co2?,
            total_co2: self.total_co2?,
        })
    }
}

impl From<&SubmissionRecord> for LedgerRow {
    fn from(record: &SubmissionRecord) -> Self {
        Self {
            name: Some(record.name.clone()),
            year: Some(record.year),
            electricity_co2: Some(record.electricity_co2),
            waste_co2: Some(record.waste_co2),
            travel_co2: Some(record.travel_co2),
            total_co2: Some(record.total_co2),
        }
    }
}

/// Point-in-time read of the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerSnapshot {
    /// The ledger file does not exist
    NoData,
    /// Every row, in append order
    Rows(Vec<LedgerRow>),
}

impl LedgerSnapshot {
    pub fn rows(&self) -> &[LedgerRow] {
        match self {
            LedgerSnapshot::NoData => &[],
            LedgerSnapshot::Rows(rows) => rows,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, LedgerSnapshot::NoData)
    }

    /// Rows with every cell valid, in append order. Incomplete rows are dropped.
    pub fn complete_records(&self) -> Vec<SubmissionRecord> {
        self.rows().iter().filter_map(LedgerRow::to_record).collect()
    }

    /// Every parseable `Total (kg CO2)` value, regardless of the other cells
    pub fn totals(&self) -> Vec<f64> {
        self.rows().iter().filter_map(|row| row.total_co2).collect()
    }
}

/// Append-only CSV store of submission records
///
/// The store owns the ledger file. Appends and snapshot reads are serialized
/// through an internal lock so a reader never sees a half-written row.
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LedgerStore {
    /// Open the ledger at `path`, creating the file with its header if absent
    ///
    /// # Arguments
    /// * `path` - Location of the CSV file; parent folders are created as needed
    ///
    /// # Examples
    /// ```no_run
    /// use carbon_footprint::ledger::LedgerStore;
    ///
    /// let store = LedgerStore::open("carbon_data.csv").unwrap();
    /// println!("{} rows", store.load_all().unwrap().rows().len());
    /// ```
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        store.ensure_initialized()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_initialized(&self) -> Result<(), LedgerError> {
        // An existing but empty file still needs its header.
        match metadata(&self.path) {
            Ok(meta) if !meta.is_file() || meta.len() > 0 => return Ok(()),
            _ => {}
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let mut writer = WriterBuilder::new().from_path(&self.path)?;
        writer.write_record(LEDGER_HEADER)?;
        writer.flush()?;

        info!("Created ledger {}", self.path.display());
        Ok(())
    }

    /// Add one record to the end of the ledger
    ///
    /// Repeated submissions for the same name and year accumulate as
    /// separate rows. If the file was removed since [`LedgerStore::open`],
    /// it is recreated with its header first.
    pub fn append(&self, record: &SubmissionRecord) -> Result<(), LedgerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_initialized()?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record([
            record.name.clone(),
            record.year.to_string(),
            record.electricity_co2.to_string(),
            record.waste_co2.to_string(),
            record.travel_co2.to_string(),
            record.total_co2.to_string(),
        ])?;
        writer.flush()?;

        Ok(())
    }

    /// Read every row in append order
    ///
    /// # Returns
    /// * `LedgerSnapshot::NoData` if the ledger file does not exist
    /// * `LedgerSnapshot::Rows` otherwise, with malformed cells set to `None`
    pub fn load_all(&self) -> Result<LedgerSnapshot, LedgerError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        read_snapshot(&self.path)
    }
}

/// Read a ledger file without going through a store
pub fn read_snapshot(path: &Path) -> Result<LedgerSnapshot, LedgerError> {
    if !path.exists() {
        return Ok(LedgerSnapshot::NoData);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::from_headers(&headers);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(columns.row(&record)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => warn!("Skipping unreadable ledger row {}: {}", line + 2, e),
        }
    }

    Ok(LedgerSnapshot::Rows(rows))
}

/// Positions of the schema columns in the file's header row
struct ColumnIndex {
    positions: [Option<usize>; 6],
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let positions =
            LEDGER_HEADER.map(|column| headers.iter().position(|h| h.trim() == column));
        for (column, position) in LEDGER_HEADER.iter().zip(&positions) {
            if position.is_none() {
                warn!("Ledger is missing column '{}'", column);
            }
        }
        Self { positions }
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: usize) -> Option<&'r str> {
        self.positions[column]
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
    }

    fn row(&self, record: &StringRecord) -> LedgerRow {
        LedgerRow {
            name: self.cell(record, 0).map(str::to_string),
            year: self.cell(record, 1).and_then(parse_year),
            electricity_co2: self.cell(record, 2).and_then(parse_number),
            waste_co2: self.cell(record, 3).and_then(parse_number),
            travel_co2: self.cell(record, 4).and_then(parse_number),
            total_co2: self.cell(record, 5).and_then(parse_number),
        }
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}

// Accepts "2024" and the float-formatted "2024.0".
fn parse_year(cell: &str) -> Option<i32> {
    if let Ok(year) = cell.parse::<i32>() {
        return Some(year);
    }
    let value = parse_number(cell)?;
    if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}
