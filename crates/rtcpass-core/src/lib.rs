//! `rtcpass` Core Library
//!
//! Shared functionality for `rtcpass` components:
//! - Layered configuration (defaults, settings file, environment)
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
