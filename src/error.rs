use thiserror::Error;

/// Rejected submission input. Nothing is persisted when one of these is raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Name cannot be empty.")]
    EmptyName,

    #[error("Year is required.")]
    MissingYear,

    #[error("'{field}' must be a number (got '{value}').")]
    NotANumber { field: &'static str, value: String },

    #[error("'{field}' must be a whole number (got '{value}').")]
    NotAnInteger { field: &'static str, value: String },

    #[error("'{field}' cannot be negative.")]
    Negative { field: &'static str },

    #[error("'{field}' must be a finite number.")]
    NotFinite { field: &'static str },

    #[error("Fuel efficiency must be greater than zero.")]
    NonPositiveEfficiency,

    #[error("Recycling percentage cannot exceed 100.")]
    RecyclingAbove100,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("chart image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure of the submit pipeline before a record reached the ledger.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
