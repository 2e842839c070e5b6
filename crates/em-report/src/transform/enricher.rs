//! Derived column insertion.

use super::operators::OperatorMap;
use crate::error::Result;
use crate::types::Period;
use crate::utils::{
    FROM_COLUMN, MONTH_COLUMN, OPERATOR_CODE_COLUMN, OPERATOR_COLUMN, SOURCE_FILE_COLUMN,
    TO_COLUMN, YEAR_COLUMN, date_series,
};
use polars::prelude::*;
use tracing::{debug, warn};

const DERIVED_COLUMNS: [&str; 6] = [
    YEAR_COLUMN,
    MONTH_COLUMN,
    FROM_COLUMN,
    TO_COLUMN,
    OPERATOR_CODE_COLUMN,
    SOURCE_FILE_COLUMN,
];

/// Summary of one enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichOutcome {
    /// Whether a raw operator column was found and mapped.
    pub has_operator: bool,
    /// Rows whose operator label did not map.
    pub unmapped_rows: usize,
}

/// Inserts the reporting period, canonical operator name and source file into a
/// parsed table.
///
/// Resulting layout: `Year, Month, From, To, <raw columns...>, _source_file`, with
/// `SCO2` directly after `SCO` when the table has one.
#[derive(Debug, Clone, Copy)]
pub struct RowEnricher<'a> {
    operators: &'a OperatorMap,
}

impl<'a> RowEnricher<'a> {
    pub fn new(operators: &'a OperatorMap) -> Self {
        Self { operators }
    }

    pub fn enrich(
        &self,
        mut df: DataFrame,
        period: Period,
        source_file: &str,
    ) -> Result<(DataFrame, EnrichOutcome)> {
        rename_reserved_columns(&mut df)?;
        let height = df.height();
        let mut outcome = EnrichOutcome::default();

        if let Some(index) = df.get_column_index(OPERATOR_COLUMN) {
            let raw = df
                .column(OPERATOR_COLUMN)?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let names: Vec<&str> = raw
                .str()?
                .into_iter()
                .map(|value| self.operators.display_name(value))
                .collect();

            outcome.has_operator = true;
            outcome.unmapped_rows = names.iter().filter(|name| name.is_empty()).count();
            if outcome.unmapped_rows > 0 {
                warn!(
                    "{}: {} row(s) with an unmapped operator",
                    source_file, outcome.unmapped_rows
                );
            }

            df.insert_column(index + 1, Series::new(OPERATOR_CODE_COLUMN.into(), names))?;
        } else {
            debug!("{}: no '{}' column, skipping operator mapping", source_file, OPERATOR_COLUMN);
        }

        let year = Series::new(YEAR_COLUMN.into(), vec![period.year(); height]);
        let month = date_series(MONTH_COLUMN, &vec![period.from; height])?;
        let from = date_series(FROM_COLUMN, &vec![period.from; height])?;
        let to = date_series(TO_COLUMN, &vec![period.to; height])?;

        for (index, series) in [year, month, from, to].into_iter().enumerate() {
            df.insert_column(index, series)?;
        }

        let source = Series::new(SOURCE_FILE_COLUMN.into(), vec![source_file; height]);
        df.with_column(source)?;

        Ok((df, outcome))
    }
}

/// Move raw columns out of the way of derived ones, e.g. `Year` -> `Year (source)`.
fn rename_reserved_columns(df: &mut DataFrame) -> Result<()> {
    for name in DERIVED_COLUMNS {
        if df.get_column_index(name).is_none() {
            continue;
        }

        let mut renamed = format!("{name} (source)");
        let mut n = 2;
        while df.get_column_index(&renamed).is_some() {
            renamed = format!("{name} (source {n})");
            n += 1;
        }

        warn!("Column '{}' is reserved, renaming it to '{}'", name, renamed);
        df.rename(name, renamed.into())?;
    }
    Ok(())
}
