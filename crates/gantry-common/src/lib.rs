//! Shared foundations for the gantry harness
//!
//! Holds the pieces every gantry crate needs: the structured error type,
//! kube client construction, ApiResource building, and logging setup.

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
