//! Data module - CSV loading, derivation, joining and region selection

pub mod columns;
mod loader;
mod processor;
mod selector;

pub use loader::{date_to_days, days_to_date, decode_latin1, DataLoader, LoaderError, Observations};
pub use processor::{DataProcessor, JoinOutcome, ProcessorError};
pub use selector::RegionSelector;

pub(crate) use loader::{date_values, f64_values, i64_values};
