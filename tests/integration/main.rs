//! Integration tests for the HTTP API.
//!
//! Run with: `cargo test --test integration`

mod common;
mod live_server_test;
mod rest_api_test;
