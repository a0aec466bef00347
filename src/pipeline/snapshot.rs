use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::common::constants::{LAST_REVIEW_COL, LAST_REVIEW_FORMAT, PRICE_COL};
use crate::common::error::{CleaningError, Result};

/// Load a CSV snapshot with every column read as text, so pass-through
/// columns round-trip unchanged. Requires a header row.
pub fn read_snapshot(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Every column in `required` must be present in the snapshot.
pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let names = df.get_column_names();
    for required_name in required {
        if !names.iter().any(|name| name.as_str() == *required_name) {
            return Err(CleaningError::Schema((*required_name).to_string()));
        }
    }
    Ok(())
}

/// Keep rows whose price lies in the inclusive `[min_price, max_price]`
/// range. The price text is cast to f64 for the comparison only; values
/// that do not parse become null, fail the comparison, and drop out. The
/// stored column keeps its original text.
pub fn filter_price_range(df: DataFrame, min_price: i64, max_price: i64) -> Result<DataFrame> {
    let price = col(PRICE_COL).cast(DataType::Float64);
    let kept = df
        .lazy()
        .filter(
            price
                .clone()
                .gt_eq(lit(min_price as f64))
                .and(price.lt_eq(lit(max_price as f64))),
        )
        .collect()?;
    Ok(kept)
}

/// Re-type `last_review` from text to a date column. Parsing is permissive:
/// values that do not match `%Y-%m-%d` become null instead of failing.
pub fn normalize_last_review(df: DataFrame) -> Result<DataFrame> {
    let normalized = df
        .lazy()
        .with_column(col(LAST_REVIEW_COL).str().to_date(StrptimeOptions {
            format: Some(LAST_REVIEW_FORMAT.into()),
            strict: false,
            ..Default::default()
        }))
        .collect()?;
    Ok(normalized)
}

/// Write the snapshot to `path` with a header row and no index column,
/// overwriting any existing file. Dates serialize as `YYYY-MM-DD`, nulls as
/// empty fields.
pub fn write_snapshot(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
