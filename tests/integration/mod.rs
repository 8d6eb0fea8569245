//! Integration tests for the pageforge generation pipeline

mod config_integration;
mod http_frontend;
mod metadata_store;
mod test_utils;
mod validation_harness;
