//! db-ask - ask a database questions in plain language.
//!
//! This library exposes the core modules for use by the `ask` binary and
//! integration tests.

pub mod agents;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod render;
pub mod safety;
