//! Data module - CSV loading, normalization and record extraction

pub mod loader;
mod processor;
mod records;

pub use loader::{DataLoader, LoaderError};
pub use processor::{DataProcessor, ProcessorError};
pub use records::{ConsumptionRecord, ProductionRecord, WithdrawalRecord, WithdrawalTable};
