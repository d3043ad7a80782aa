use thiserror::Error;

/// Errors raised by the record table and the yearly aggregators.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    /// A required column does not exist in the table.
    #[error("column {name:?} does not exist")]
    MissingColumn { name: String },

    /// A column exists but holds values of the wrong kind.
    #[error("column {name:?} must be {expected}, but is {found}")]
    ColumnType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A column name appears twice.
    #[error("column {name:?} already exists")]
    DuplicateColumn { name: String },

    /// A new column does not match the table row count.
    #[error("column {name:?} must have {expected} rows, but has {found}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A date column has no present value, so no year span can be resolved.
    #[error("column {name:?} has no present dates")]
    EmptyDateColumn { name: String },

    /// The resolved year span is too wide to bin.
    #[error("year span {min_year}..{max_year} is wider than {max_len} years")]
    SpanTooWide {
        min_year: i64,
        max_year: i64,
        max_len: i64,
    },

    /// A date column holds an infinite value.
    #[error("column {name:?} has a non-finite date at row {row}")]
    NonFiniteDate { name: String, row: usize },
}

pub type TableResult<T> = Result<T, TableError>;
