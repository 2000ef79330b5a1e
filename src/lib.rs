//! StAR MF Order Gateway Library
//!
//! Places mutual-fund orders on the exchange's SOAP order-entry service on
//! behalf of advisors, tracking every attempt in a local order store.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod protocol;
pub mod rate_limit;
pub mod secrets;
