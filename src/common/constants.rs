// Shared name constants so the column and file names stay consistent
// across the pipeline, the store adapters, and the tests.

// Columns the cleaning step operates on
pub const PRICE_COL: &str = "price";
pub const LAST_REVIEW_COL: &str = "last_review";

// Fixed local output file name (overwritten on every run)
pub const CLEAN_OUTPUT_FILE: &str = "clean_sample.csv";

// Date exchange format for `last_review` (ISO-8601 date)
pub const LAST_REVIEW_FORMAT: &str = "%Y-%m-%d";

// Job type recorded against the run for provenance
pub const JOB_TYPE: &str = "basic_cleaning";

// Alias that always points at the newest version of an artifact
pub const LATEST_ALIAS: &str = "latest";
