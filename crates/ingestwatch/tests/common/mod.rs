//! Shared test utilities for ingestwatch integration tests.
//!
//! This module provides:
//! - `TestHarness` driving a `JobController` over an in-memory stream
//! - `FakeApi` recording every call made to the server
//! - Builders producing raw wire payloads

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ApiCall, FakeApi, TestHarness};
