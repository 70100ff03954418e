//! Integration tests for esim-relay
//!
//! These tests use wiremock to stand in for the webhook endpoint and `sh` to
//! stand in for the scraping framework.

#[cfg(unix)]
mod cli_tests;
mod delivery_tests;
