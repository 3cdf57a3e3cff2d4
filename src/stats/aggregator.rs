//! Aggregation Module
//! Grouped means, regional totals and yearly withdrawal profiles.
//!
//! Every operation takes an ordered slice of records and returns a new
//! vector; inputs are never mutated.

use crate::data::{ConsumptionRecord, ProductionRecord, WithdrawalRecord, WithdrawalTable};
use chrono::{Datelike, NaiveDate};
use log::debug;
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Sector '{sector}' covers several years {years:?}, expected exactly one")]
    MultipleYears { sector: String, years: Vec<i32> },
}

/// Records labelled with an administrative region.
pub trait Regional {
    fn region(&self) -> &str;
}

/// Records positioned on the time axis.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Regional for ProductionRecord {
    fn region(&self) -> &str {
        &self.region
    }
}

impl Regional for ConsumptionRecord {
    fn region(&self) -> &str {
        &self.region
    }
}

impl Regional for WithdrawalRecord {
    fn region(&self) -> &str {
        &self.region
    }
}

impl Dated for ProductionRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for ConsumptionRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for WithdrawalRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalTotal {
    pub date: NaiveDate,
    pub region: String,
    pub total: f64,
}

/// Bucket sums over one calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyProfile {
    pub year: i32,
    pub values: Vec<f64>,
}

/// Yearly withdrawal profile of one sector, indexed by bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorProfile {
    pub label: String,
    pub sector: String,
    pub buckets: Vec<String>,
    /// `None` when no rows matched.
    pub year: Option<i32>,
    pub values: Vec<f64>,
}

impl SectorProfile {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Derives every table the report needs.
pub struct Aggregator;

impl Aggregator {
    /// Rows whose region equals `region` exactly, original order kept.
    pub fn filter_region<T: Regional + Clone>(records: &[T], region: &str) -> Vec<T> {
        records
            .iter()
            .filter(|r| r.region() == region)
            .cloned()
            .collect()
    }

    /// Rows dated on or after `cutoff`, original order kept.
    pub fn since<T: Dated + Clone>(records: &[T], cutoff: NaiveDate) -> Vec<T> {
        records
            .iter()
            .filter(|r| r.date() >= cutoff)
            .cloned()
            .collect()
    }

    /// Mean total production across regions, per date.
    pub fn national_mean_production(records: &[ProductionRecord]) -> Vec<DatedValue> {
        let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for record in records {
            by_date
                .entry(record.date)
                .or_default()
                .push(record.total_production());
        }

        by_date
            .into_iter()
            .map(|(date, totals)| DatedValue {
                date,
                value: totals.iter().mean(),
            })
            .collect()
    }

    /// Mean consumption across regions, per date, rounded to 2 decimals.
    ///
    /// Missing values are skipped; a date with none present is omitted.
    pub fn national_mean_consumption(records: &[ConsumptionRecord]) -> Vec<DatedValue> {
        let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for record in records {
            let values = by_date.entry(record.date).or_default();
            if let Some(value) = record.consumption {
                values.push(value);
            }
        }

        by_date
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(date, values)| DatedValue {
                date,
                value: round2(values.iter().mean()),
            })
            .collect()
    }

    /// Total production summed per (date, region).
    pub fn regional_totals(records: &[ProductionRecord]) -> Vec<RegionalTotal> {
        let mut totals: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
        for record in records {
            *totals
                .entry((record.date, record.region.as_str()))
                .or_insert(0.0) += record.total_production();
        }

        totals
            .into_iter()
            .map(|((date, region), total)| RegionalTotal {
                date,
                region: region.to_string(),
                total,
            })
            .collect()
    }

    /// Resample daily bucket vectors to calendar years by summation.
    ///
    /// Years between the first and last present year are filled with zeros.
    pub fn yearly_profiles(records: &[WithdrawalRecord], bucket_count: usize) -> Vec<YearlyProfile> {
        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for record in records {
            let sums = by_year
                .entry(record.date().year())
                .or_insert_with(|| vec![0.0; bucket_count]);
            for (sum, value) in sums.iter_mut().zip(&record.values) {
                *sum += value;
            }
        }

        let (Some(&first), Some(&last)) = (by_year.keys().next(), by_year.keys().next_back())
        else {
            return Vec::new();
        };

        (first..=last)
            .map(|year| YearlyProfile {
                year,
                values: by_year
                    .remove(&year)
                    .unwrap_or_else(|| vec![0.0; bucket_count]),
            })
            .collect()
    }

    /// Yearly profile of one region and sector.
    ///
    /// No matching rows gives an empty profile; rows spread over more than
    /// one year are rejected rather than truncated to the first.
    pub fn sector_profile(
        table: &WithdrawalTable,
        region: &str,
        sector: &str,
        label: &str,
    ) -> Result<SectorProfile, AggregateError> {
        let selected: Vec<WithdrawalRecord> = Self::filter_region(&table.records, region)
            .into_iter()
            .filter(|r| r.sector == sector)
            .collect();
        debug!("{} rows for sector '{}' in '{}'", selected.len(), sector, region);

        let mut yearly = Self::yearly_profiles(&selected, table.buckets.len());
        if yearly.len() > 1 {
            return Err(AggregateError::MultipleYears {
                sector: sector.to_string(),
                years: yearly.iter().map(|p| p.year).collect(),
            });
        }

        let (year, values) = match yearly.pop() {
            Some(profile) => (Some(profile.year), profile.values),
            None => (None, Vec::new()),
        };

        Ok(SectorProfile {
            label: label.to_string(),
            sector: sector.to_string(),
            buckets: table.buckets.clone(),
            year,
            values,
        })
    }

    /// Sector x bucket table of the given profiles.
    pub fn profiles_frame(profiles: &[SectorProfile]) -> Result<DataFrame, AggregateError> {
        let buckets = profiles
            .first()
            .map(|p| p.buckets.clone())
            .unwrap_or_default();

        let mut columns = vec![Column::new(
            "Sector".into(),
            profiles.iter().map(|p| p.label.clone()).collect::<Vec<_>>(),
        )];
        for (i, bucket) in buckets.iter().enumerate() {
            let values: Vec<Option<f64>> = profiles
                .iter()
                .map(|p| p.values.get(i).copied())
                .collect();
            columns.push(Column::new(bucket.as_str().into(), values));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Two decimals, ties to even.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
