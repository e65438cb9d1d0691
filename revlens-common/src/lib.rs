//! # Revlens Common Library
//!
//! Shared code for the Revlens services:
//! - Error and result types
//! - TOML bootstrap configuration and root folder resolution
//! - Logging configuration

pub mod config;
pub mod error;

pub use error::{Error, Result};
