//! Per-file table transformation.
//!
//! - [`RowEnricher`] inserts period, operator and source columns
//! - [`DateCoercer`] converts the named date columns
//! - [`OperatorMap`] folds raw operator labels onto display names

mod dates;
mod enricher;
mod operators;

pub use dates::{DateCoercer, parse_date_value};
pub use enricher::{EnrichOutcome, RowEnricher};
pub use operators::{OperatorMap, normalize_operator};
