//! Integration tests for db-ask.

pub mod llm_client_test;
pub mod pipeline_test;
pub mod sqlite_test;
