//! # PCS Common Library
//!
//! Shared code for the percentage calculator service including:
//! - Common error type
//! - Configuration model and file resolution
//! - Database pool initialization
//! - Timestamp and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
