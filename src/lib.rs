//! Attendance aggregation over historical FN/AN attendance records.
//!
//! The engine in [`aggregate`] is pure and synchronous. Records reach it
//! through a [`source::RecordSource`], and categorical filter values are
//! checked against a [`catalog::Catalog`] before a query runs.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod report;
pub mod source;

pub use error::LedgerError;
