//! Utility module for Feedbar
//!
//! This module provides common utilities used throughout the engine:
//! - Error handling with custom error types
//! - Timestamp formatting for the position read-out

pub mod error;

// Re-export commonly used items
pub use error::{FeedbarError, Result};

/// Format a media timestamp for display
///
/// # Arguments
///
/// * `total_seconds` - Position or duration in seconds
///
/// # Returns
///
/// Formatted string in the format "m:ss". Non-finite input (an unloaded
/// video reports NaN as its duration) renders as "0:00".
pub fn format_time(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return "0:00".to_string();
    }

    let minutes = (total_seconds / 60.0).floor() as u64;
    let seconds = (total_seconds - minutes as f64 * 60.0).floor() as u64;

    format!("{}:{:02}", minutes, seconds)
}

/// Format a 0.0..=1.0 fraction as a percentage width for a bar fill
pub fn percent_width(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}
