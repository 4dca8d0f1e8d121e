//! API Module
//!
//! Command handlers behind the CLI. Each handler loads the history, derives
//! the schema and drives the model layer; argument parsing stays in `main`.

pub mod commands;
