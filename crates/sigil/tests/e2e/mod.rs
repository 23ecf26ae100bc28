//! End-to-end tests: requests driven through the dispatcher and the CLI
//! command handlers.

pub mod cli_flow_test;
pub mod sign_flow_test;
