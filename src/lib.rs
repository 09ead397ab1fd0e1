//! gcamreader - run batch queries against GCAM scenario databases.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod query;
