//! Typed records extracted from normalized tables.

use crate::data::loader::ISO_DATE;
use crate::data::{DataProcessor, ProcessorError};
use chrono::NaiveDate;
use polars::prelude::*;

/// Annual production of one region, sources in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecord {
    pub date: NaiveDate,
    pub region: String,
    pub sources: Vec<f64>,
}

impl ProductionRecord {
    /// Sum of the source columns, recomputed on every call.
    pub fn total_production(&self) -> f64 {
        self.sources.iter().sum()
    }

    pub fn from_frame(
        df: &DataFrame,
        time_column: &str,
        region_column: &str,
        source_columns: &[&str],
    ) -> Result<Vec<Self>, ProcessorError> {
        let dates = date_values(df, time_column)?;
        let regions = text_values(df, region_column)?;
        let sources = source_columns
            .iter()
            .map(|name| float_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(dates
            .into_iter()
            .zip(regions)
            .enumerate()
            .map(|(row, (date, region))| Self {
                date,
                region,
                sources: sources
                    .iter()
                    .map(|column| column[row].unwrap_or(0.0))
                    .collect(),
            })
            .collect())
    }
}

/// Weather-corrected net consumption of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRecord {
    pub date: NaiveDate,
    pub region: String,
    pub consumption: Option<f64>,
}

impl ConsumptionRecord {
    pub fn from_frame(
        df: &DataFrame,
        time_column: &str,
        region_column: &str,
        consumption_column: &str,
    ) -> Result<Vec<Self>, ProcessorError> {
        let dates = date_values(df, time_column)?;
        let regions = text_values(df, region_column)?;
        let consumption = float_values(df, consumption_column)?;

        Ok(dates
            .into_iter()
            .zip(regions)
            .zip(consumption)
            .map(|((date, region), consumption)| Self {
                date,
                region,
                consumption,
            })
            .collect())
    }
}

/// Daily withdrawals for one region and sector, one value per bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRecord {
    pub date: NaiveDate,
    pub region: String,
    pub sector: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct WithdrawalTable {
    /// Bucket labels, in column order.
    pub buckets: Vec<String>,
    pub records: Vec<WithdrawalRecord>,
}

impl WithdrawalTable {
    pub fn from_frame(
        df: &DataFrame,
        time_column: &str,
        region_column: &str,
        sector_column: &str,
        buckets: &[String],
    ) -> Result<Self, ProcessorError> {
        let dates = date_values(df, time_column)?;
        let regions = text_values(df, region_column)?;
        let sectors = text_values(df, sector_column)?;
        let columns = buckets
            .iter()
            .map(|name| float_values(df, name))
            .collect::<Result<Vec<_>, _>>()?;

        let records = dates
            .into_iter()
            .zip(regions)
            .zip(sectors)
            .enumerate()
            .map(|(row, ((date, region), sector))| WithdrawalRecord {
                date,
                region,
                sector,
                values: columns
                    .iter()
                    .map(|column| column[row].unwrap_or(0.0))
                    .collect(),
            })
            .collect();

        Ok(Self {
            buckets: buckets.to_vec(),
            records,
        })
    }
}

fn column_of<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ProcessorError> {
    df.column(name)
        .map_err(|_| ProcessorError::MissingColumn(name.to_string()))
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<String>, ProcessorError> {
    let column = column_of(df, name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| ProcessorError::MissingValue {
                    column: name.to_string(),
                    row,
                })
        })
        .collect();
    values
}

fn date_values(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>, ProcessorError> {
    let column = column_of(df, name)?;
    let dates = column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .and_then(|v| NaiveDate::parse_from_str(v, ISO_DATE).ok())
                .ok_or_else(|| ProcessorError::MissingValue {
                    column: name.to_string(),
                    row,
                })
        })
        .collect();
    dates
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
    let column = DataProcessor::to_float(column_of(df, name)?)?;
    let values = column.f64()?.into_iter().collect();
    Ok(values)
}
