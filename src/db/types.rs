//! Query result types for gcamreader.
//!
//! Defines the structures used to represent what the engine hands back.

use crate::error::{GcamError, Result};

/// Tabular result of one query.
///
/// Values are kept exactly as the engine printed them so that exported
/// files are byte-stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Column names, in engine order.
    pub columns: Vec<String>,

    /// Rows of data. Each row has one value per column.
    pub rows: Vec<Row>,
}

/// A row of data from a query result.
pub type Row = Vec<String>;

impl QueryResult {
    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Parses the comma-separated, header-first output of the engine.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| GcamError::query(format!("CSV parse error: {}", e)))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| GcamError::query(format!("CSV parse error: {}", e)))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What running one query produced.
///
/// Engine failures scoped to a single query are reported as `NoResult`
/// instead of an error so a batch keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The engine returned data.
    Data(QueryResult),
    /// The engine returned nothing usable.
    NoResult {
        /// Why there is no data.
        reason: String,
    },
}

impl QueryOutcome {
    /// Creates a no-result outcome with the given reason.
    pub fn no_result(reason: impl Into<String>) -> Self {
        Self::NoResult {
            reason: reason.into(),
        }
    }

    /// Classifies raw engine CSV output.
    ///
    /// Blank output, unparseable output and header-only tables all count as
    /// no result.
    pub fn from_engine_output(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::no_result("engine returned no output");
        }
        match QueryResult::from_csv(text) {
            Ok(result) if result.is_empty() => Self::no_result("query returned no rows"),
            Ok(result) => Self::Data(result),
            Err(e) => Self::no_result(e.to_string()),
        }
    }
}
