//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Shared result model (matches, dependency graphs, errors)
//! - Plain-text report rendering
//! - Path normalization utilities
//! - File reading strategies
//! - Common utilities

pub mod file_reader;
pub mod model;
pub mod paths;
pub mod render;
pub mod util;
