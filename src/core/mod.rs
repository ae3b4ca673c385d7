//! Core infrastructure module
//!
//! Unified error types (`AppError`, `Result`) for the content engine.

mod error;

pub use error::{AppError, Result};
