//! Data Processor Module
//! Column renaming, missing-value filling, sorting and row selection.

use crate::config::{BucketSlice, ColumnMapping};
use crate::data::DataLoader;
use log::debug;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },
    #[error("Column '{column}', row {row}: {value:?} is not a number")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Cannot slice buckets: {available} columns after the time axis, {leading} leading and {trailing} trailing requested")]
    BucketSlice {
        available: usize,
        leading: usize,
        trailing: usize,
    },
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Rename every column through `mapping`.
    pub fn rename_columns(
        mut df: DataFrame,
        mapping: &ColumnMapping,
    ) -> Result<DataFrame, ProcessorError> {
        for name in DataLoader::get_columns(&df) {
            let canonical = mapping.apply(&name);
            if canonical != name {
                debug!("Renaming '{}' -> '{}'", name, canonical);
                df.rename(&name, canonical.into())?;
            }
        }
        Ok(df)
    }

    /// Cast numeric columns (and every `required` column) to Float64 with nulls as zero.
    ///
    /// Only empty cells become zero; a cell that does not parse as a number
    /// is an error.
    pub fn fill_missing(mut df: DataFrame, required: &[&str]) -> Result<DataFrame, ProcessorError> {
        let mut targets = DataLoader::get_numeric_columns(&df);
        for name in required {
            if df.column(name).is_err() {
                return Err(ProcessorError::MissingColumn(name.to_string()));
            }
            if !targets.iter().any(|t| t.as_str() == *name) {
                targets.push(name.to_string());
            }
        }

        for name in &targets {
            let numeric = Self::to_float(df.column(name)?)?;
            df.with_column(numeric)?;
        }

        let exprs: Vec<Expr> = targets
            .iter()
            .map(|name| col(name.as_str()).fill_null(lit(0.0)))
            .collect();

        Ok(df.lazy().with_columns(exprs).collect()?)
    }

    /// Cast a column to Float64, keeping nulls.
    ///
    /// Fails on the first non-null cell the cast turns into null.
    pub fn to_float(column: &Column) -> Result<Column, ProcessorError> {
        let numeric = column.cast(&DataType::Float64)?;
        if numeric.null_count() == column.null_count() {
            return Ok(numeric);
        }

        let text = column.cast(&DataType::String)?;
        let invalid = text
            .str()?
            .into_iter()
            .zip(numeric.f64()?.into_iter())
            .enumerate()
            .find_map(|(row, (raw, value))| match (raw, value) {
                (Some(raw), None) => Some((row, raw.to_string())),
                _ => None,
            });
        match invalid {
            Some((row, value)) => Err(ProcessorError::InvalidNumber {
                column: column.name().to_string(),
                row,
                value,
            }),
            None => Ok(numeric),
        }
    }

    /// Name of the column at `index`.
    pub fn time_column_name(df: &DataFrame, index: usize) -> Result<String, ProcessorError> {
        DataLoader::get_columns(df)
            .get(index)
            .cloned()
            .ok_or_else(|| ProcessorError::MissingColumn(format!("#{}", index)))
    }

    /// Stable sort on the ISO date column.
    pub fn sort_by_time(df: DataFrame, time_column: &str) -> Result<DataFrame, ProcessorError> {
        if df.column(time_column).is_err() {
            return Err(ProcessorError::MissingColumn(time_column.to_string()));
        }
        let sorted = df
            .lazy()
            .sort_by_exprs(
                vec![col(time_column)],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(sorted)
    }

    /// Rename, sort by time, then zero-fill the production table.
    ///
    /// Running it on its own output changes nothing.
    pub fn normalize_production(
        df: DataFrame,
        mapping: &ColumnMapping,
        time_column: usize,
    ) -> Result<DataFrame, ProcessorError> {
        let df = Self::rename_columns(df, mapping)?;
        let time_name = Self::time_column_name(&df, time_column)?;
        let df = Self::sort_by_time(df, &time_name)?;
        Self::fill_missing(df, &mapping.canonical())
    }

    /// Keep rows where every `(column, value)` pair matches exactly.
    pub fn filter_equals(
        df: &DataFrame,
        filters: &[(&str, &str)],
    ) -> Result<DataFrame, ProcessorError> {
        let mut predicate: Option<Expr> = None;
        for (column, value) in filters {
            if df.column(column).is_err() {
                return Err(ProcessorError::MissingColumn(column.to_string()));
            }
            let condition = col(*column).eq(lit(*value));
            predicate = Some(match predicate {
                Some(p) => p.and(condition),
                None => condition,
            });
        }

        let Some(predicate) = predicate else {
            return Ok(df.clone());
        };
        let filtered = df.clone().lazy().filter(predicate).collect()?;
        Ok(filtered)
    }

    /// Names of the contiguous sub-daily bucket columns.
    pub fn bucket_columns(
        df: &DataFrame,
        time_column: usize,
        slice: BucketSlice,
    ) -> Result<Vec<String>, ProcessorError> {
        let columns = DataLoader::get_columns(df);
        let after_time = columns.get(time_column + 1..).unwrap_or_default();
        let available = after_time.len();
        if available < slice.leading + slice.trailing {
            return Err(ProcessorError::BucketSlice {
                available,
                leading: slice.leading,
                trailing: slice.trailing,
            });
        }
        Ok(after_time[slice.leading..available - slice.trailing].to_vec())
    }
}
