//! Core data types for the serial plotter
//!
//! This module contains the fundamental data structures used throughout
//! the application for representing sensor channels, parsed telemetry
//! and acquisition state.
//!
//! # Main Types
//!
//! - [`SensorChannel`] - Enum of the sensors a device can report (accelerometer, gyroscope, encoders)
//! - [`Reading`] - The axis values of one channel at one tick
//! - [`ParsedSample`] - A fully-populated multi-channel line, before it gets a timestamp
//! - [`Sample`] - A parsed line after the buffer assigned its index and timestamp
//! - [`AcquisitionState`] - Lifecycle of a session, owned by the session controller
//! - [`AcquisitionStats`] - Counters kept by the acquisition loop
//!
//! # Timestamps
//!
//! Timestamps are not wall-clock time. The k-th sample appended to a buffer is
//! stamped `k × timebase`, because the device emits at a fixed nominal tick.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of axes every supported channel reports
pub const AXIS_COUNT: usize = 3;

/// A sensor source with a fixed number of numeric axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorChannel {
    /// Linear acceleration, line prefix `Accel`
    Accelerometer,
    /// Angular rate, line prefix `Gyro`
    Gyroscope,
    /// Wheel/shaft encoder counts, line prefix `Enc`
    Encoders,
}

impl SensorChannel {
    /// Get all channels in display order
    pub fn all() -> &'static [SensorChannel] {
        &[
            SensorChannel::Accelerometer,
            SensorChannel::Gyroscope,
            SensorChannel::Encoders,
        ]
    }

    /// The lexical marker that starts this channel's segment on a telemetry line
    pub fn prefix(&self) -> &'static str {
        match self {
            SensorChannel::Accelerometer => "Accel",
            SensorChannel::Gyroscope => "Gyro",
            SensorChannel::Encoders => "Enc",
        }
    }

    /// Look up a channel by its line prefix (exact, case-sensitive)
    pub fn from_prefix(prefix: &str) -> Option<SensorChannel> {
        Self::all().iter().copied().find(|c| c.prefix() == prefix)
    }

    pub fn axis_count(&self) -> usize {
        AXIS_COUNT
    }

    /// Axis names used in plot legends and export headers
    pub fn axis_labels(&self) -> &'static [&'static str; AXIS_COUNT] {
        match self {
            SensorChannel::Accelerometer | SensorChannel::Gyroscope => &["x", "y", "z"],
            SensorChannel::Encoders => &["e0", "e1", "e2"],
        }
    }

    /// Lowercase identifier used in export column names
    pub fn key(&self) -> &'static str {
        match self {
            SensorChannel::Accelerometer => "accelerometer",
            SensorChannel::Gyroscope => "gyroscope",
            SensorChannel::Encoders => "encoders",
        }
    }

    /// Get display name for this channel
    pub fn display_name(&self) -> &'static str {
        match self {
            SensorChannel::Accelerometer => "Accelerometer",
            SensorChannel::Gyroscope => "Gyroscope",
            SensorChannel::Encoders => "Encoders",
        }
    }

    /// Column name for one axis in an exported table, `<channel>_<axis>`
    pub fn column_name(&self, axis: usize) -> String {
        format!("{}_{}", self.key(), self.axis_labels()[axis])
    }
}

impl std::fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Axis values of one channel at one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub channel: SensorChannel,
    pub values: [i32; AXIS_COUNT],
}

impl Reading {
    pub fn new(channel: SensorChannel, values: [i32; AXIS_COUNT]) -> Self {
        Self { channel, values }
    }
}

/// A telemetry line that parsed cleanly for every selected channel
///
/// Readings are ordered like the parser's channel schema, which is also the
/// column layout of the buffer they are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSample {
    pub readings: Vec<Reading>,
}

impl ParsedSample {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    /// Get the reading for a channel, if present
    pub fn reading(&self, channel: SensorChannel) -> Option<&Reading> {
        self.readings.iter().find(|r| r.channel == channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = SensorChannel> + '_ {
        self.readings.iter().map(|r| r.channel)
    }
}

/// A sample as stored in the buffer: parsed values plus its tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Global append index, starting at 0 for the first sample after a clear
    pub index: u64,
    /// `index × timebase`
    pub timestamp: Duration,
    pub readings: Vec<Reading>,
}

impl Sample {
    pub fn reading(&self, channel: SensorChannel) -> Option<&Reading> {
        self.readings.iter().find(|r| r.channel == channel)
    }
}

/// Lifecycle of an acquisition session
///
/// Owned by the session controller. The background loop only reports how it
/// exited; it never moves the state itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    /// No connection
    #[default]
    Idle,
    /// Port is being opened
    Opening,
    /// Acquisition loop is running
    Running,
    /// Stop requested, waiting for the loop to exit
    Stopping,
    /// Loop exited cleanly, port released
    Stopped,
    /// Loop exited on an unrecoverable stream error
    Failed(String),
}

impl AcquisitionState {
    pub fn is_running(&self) -> bool {
        matches!(self, AcquisitionState::Running)
    }
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionState::Idle => write!(f, "Idle"),
            AcquisitionState::Opening => write!(f, "Opening"),
            AcquisitionState::Running => write!(f, "Running"),
            AcquisitionState::Stopping => write!(f, "Stopping"),
            AcquisitionState::Stopped => write!(f, "Stopped"),
            AcquisitionState::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

/// Counters kept by the acquisition loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    /// Total raw bytes received from the port
    pub bytes_read: u64,
    /// Complete lines produced by the framer
    pub lines_read: u64,
    /// Samples appended to the buffer
    pub samples_appended: u64,
    /// Lines rejected by the parser
    pub parse_errors: u64,
    /// Free-text lines without a channel marker
    pub info_lines: u64,
}

impl AcquisitionStats {
    /// Fraction of telemetry lines that parsed, as a percentage
    pub fn parse_success_rate(&self) -> f64 {
        let total = self.samples_appended + self.parse_errors;
        if total == 0 {
            100.0
        } else {
            (self.samples_appended as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_round_trip() {
        for channel in SensorChannel::all() {
            assert_eq!(SensorChannel::from_prefix(channel.prefix()), Some(*channel));
        }
        assert_eq!(SensorChannel::from_prefix("accel"), None);
        assert_eq!(SensorChannel::from_prefix("Magnet"), None);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(SensorChannel::Accelerometer.column_name(0), "accelerometer_x");
        assert_eq!(SensorChannel::Encoders.column_name(2), "encoders_e2");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AcquisitionState::Running.to_string(), "Running");
        assert_eq!(
            AcquisitionState::Failed("unplugged".into()).to_string(),
            "Failed: unplugged"
        );
        assert!(!AcquisitionState::Stopping.is_running());
    }

    #[test]
    fn test_parse_success_rate() {
        let mut stats = AcquisitionStats::default();
        assert_eq!(stats.parse_success_rate(), 100.0);
        stats.samples_appended = 3;
        stats.parse_errors = 1;
        assert!((stats.parse_success_rate() - 75.0).abs() < 1e-9);
    }
}
