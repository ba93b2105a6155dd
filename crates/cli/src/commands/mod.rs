//! CLI command handlers

pub mod ledger;
