//! Runtime settings that can be modified during application execution
//!
//! These are display preferences the operator changes while a session runs.
//! They never reach the acquisition loop: the loop only sees the
//! [`SerialConfig`](super::SerialConfig) snapshot taken at open time.

use super::DisplayConfig;
use serde::{Deserialize, Serialize};

/// Smallest plot window the operator can select
pub const MIN_WINDOW_LEN: usize = 5;

/// Largest plot window the operator can select
pub const MAX_WINDOW_LEN: usize = 5_000;

/// Number of text lines kept in the log view before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 2_000;

/// Runtime display settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeSettings {
    /// Samples shown in the live plot
    pub window_len: usize,

    /// Freeze the plot on the last drawn window (acquisition keeps running)
    pub paused: bool,

    /// Whether to show the plot legend
    pub show_legend: bool,

    /// Use each channel's configured display range instead of fitting the data
    pub fixed_y_range: bool,

    /// Keep the log view scrolled to the newest line
    pub autoscroll_log: bool,

    /// Maximum number of lines kept in the log view
    pub log_capacity: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            window_len: super::DEFAULT_WINDOW_LEN,
            paused: false,
            show_legend: true,
            fixed_y_range: true,
            autoscroll_log: true,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl RuntimeSettings {
    /// Create runtime settings seeded from the display configuration
    pub fn from_display_config(display: &DisplayConfig) -> Self {
        Self {
            window_len: display.window_len.clamp(MIN_WINDOW_LEN, MAX_WINDOW_LEN),
            ..Default::default()
        }
    }

    /// Set the plot window, clamped to the supported range
    pub fn set_window_len(&mut self, len: usize) {
        self.window_len = len.clamp(MIN_WINDOW_LEN, MAX_WINDOW_LEN);
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
}
