pub mod ports;
pub mod clean_use_case;
