//! CSV Data Loader Module
//! Reads delimited files with Polars and normalizes the time column to ISO dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Date layout the time column is rewritten to; sorts lexically in time order.
pub const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{}: no column at index {index} for the time axis", .path.display())]
    MissingTimeColumn { path: PathBuf, index: usize },
    #[error("Column '{column}', row {row}: cannot parse a date from {value:?}")]
    InvalidDate {
        column: String,
        row: usize,
        value: Option<String>,
    },
}

/// Loads `;`-style delimited tables whose time axis sits at a fixed column.
pub struct DataLoader {
    separator: u8,
    time_column: usize,
}

impl DataLoader {
    pub fn new(separator: u8, time_column: usize) -> Self {
        Self {
            separator,
            time_column,
        }
    }

    /// Load a CSV file and parse its time column.
    ///
    /// The time column keeps its name and position but holds `YYYY-MM-DD`
    /// strings afterwards. Malformed rows and unparseable dates are fatal.
    pub fn load_table(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let mut df = LazyCsvReader::new(path)
            .with_separator(self.separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        let name = Self::get_columns(&df)
            .get(self.time_column)
            .cloned()
            .ok_or_else(|| LoaderError::MissingTimeColumn {
                path: path.to_path_buf(),
                index: self.time_column,
            })?;

        let dates = Self::parse_time_column(&df, &name)?;
        df.with_column(Column::new(name.as_str().into(), dates))?;

        info!(
            "Loaded {} ({} rows, {} columns)",
            path.display(),
            df.height(),
            df.width()
        );
        debug!("Columns: {:?}", Self::get_columns(&df));
        Ok(df)
    }

    /// Get list of column names.
    pub fn get_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Get list of numeric column names.
    pub fn get_numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Get sorted unique values from a column.
    pub fn get_unique_values(df: &DataFrame, column: &str) -> Vec<String> {
        let mut values: Vec<String> = df
            .column(column)
            .ok()
            .and_then(|col| col.unique().ok())
            .map(|unique| {
                unique
                    .as_materialized_series()
                    .iter()
                    .filter_map(|v| {
                        if v.is_null() {
                            None
                        } else {
                            Some(v.to_string().trim_matches('"').to_string())
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        values.sort();
        values
    }

    fn parse_time_column(df: &DataFrame, name: &str) -> Result<Vec<String>, LoaderError> {
        let raw = df.column(name)?.cast(&DataType::String)?;
        let dates = raw
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .and_then(parse_time_key)
                    .map(|date| date.format(ISO_DATE).to_string())
                    .ok_or_else(|| LoaderError::InvalidDate {
                        column: name.to_string(),
                        row,
                        value: value.map(str::to_string),
                    })
            })
            .collect();
        dates
    }
}

/// Parse a time-axis cell into a calendar date.
///
/// Bare years map to January 1st; timestamps keep their date part.
pub fn parse_time_key(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1));
    }

    NaiveDate::parse_from_str(raw, ISO_DATE)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}
