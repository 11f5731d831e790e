//! # MRP Common Library
//!
//! Shared code for the mineral-rights portal services:
//! - Common error type
//! - TOML configuration and root folder resolution
//! - Database initialization (well registry and tracked-wells store)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
