//! Stats module - Aggregations over record sequences

mod aggregator;

pub use aggregator::{AggregateError, Aggregator, DatedValue, RegionalTotal, SectorProfile};
