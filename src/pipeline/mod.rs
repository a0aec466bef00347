// Tabular snapshot operations: load, schema check, filter, normalize, write

pub mod snapshot;
