//! Unit tests for the sigil binary crate: error mapping, argument parsing
//! and address codec properties.

pub mod cli_parsing_test;
pub mod error_handling_test;
