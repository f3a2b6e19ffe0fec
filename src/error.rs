//! Error handling for the serial plotter
//!
//! Two families of errors live here:
//!
//! - [`PlotterError`] covers connection, stream, export and configuration
//!   failures. These escalate to the session controller or the caller.
//! - [`ParseError`] covers a single telemetry line that could not be turned
//!   into a sample. It never escalates past the current line.

use crate::types::SensorChannel;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for serial plotter operations
#[derive(Error, Debug)]
pub enum PlotterError {
    /// The serial device could not be opened (permission, wrong name, busy)
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// Mid-session I/O failure on an open connection
    #[error("Stream fault: {0}")]
    StreamFault(String),

    /// Export could not be written to completion
    #[error("Export to {path:?} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A previously exported table could not be read back
    #[error("Import error: {0}")]
    Import(String),

    /// Errors related to configuration loading/saving or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sample's channels do not match the buffer's column layout
    #[error("Sample layout mismatch: {0}")]
    LayoutMismatch(String),

    /// An acquisition loop is already running for this session
    #[error("Acquisition loop already running")]
    AlreadyRunning,

    /// The acquisition loop did not report its exit within the join timeout
    #[error("Acquisition loop did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PlotterError>,
    },
}

impl PlotterError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PlotterError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a `PortUnavailable` from anything displayable
    pub fn port_unavailable(port: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PlotterError::PortUnavailable {
            port: port.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for serial plotter operations
pub type Result<T> = std::result::Result<T, PlotterError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

/// Fieldless discriminant of [`ParseError`], handy for matching and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    MalformedSegment,
    AxisCountMismatch,
    NumericFormat,
    MissingChannel,
    DuplicateChannel,
    InvalidEncoding,
}

/// Why a telemetry line was discarded
///
/// A line is accepted whole or not at all; none of these leave a partial
/// sample behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A segment has no `<prefix>: [...]` shape (missing bracket, unknown prefix)
    #[error("malformed segment '{segment}'")]
    MalformedSegment { segment: String },

    /// The bracketed group has the wrong number of values for its channel
    #[error("{channel} expects {expected} axes, got {actual}")]
    AxisCountMismatch {
        channel: SensorChannel,
        expected: usize,
        actual: usize,
    },

    /// A value inside the brackets is not a signed integer
    #[error("'{token}' is not an integer")]
    NumericFormat { token: String },

    /// A selected channel has no segment on this line
    #[error("line has no {0} segment")]
    MissingChannel(SensorChannel),

    /// A channel appears more than once on the same line
    #[error("{0} appears more than once")]
    DuplicateChannel(SensorChannel),

    /// The raw bytes were not valid UTF-8; `lossy` is the best-effort decoding
    #[error("invalid UTF-8 in '{lossy}'")]
    InvalidEncoding { lossy: String },
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::MalformedSegment { .. } => ParseErrorKind::MalformedSegment,
            ParseError::AxisCountMismatch { .. } => ParseErrorKind::AxisCountMismatch,
            ParseError::NumericFormat { .. } => ParseErrorKind::NumericFormat,
            ParseError::MissingChannel(_) => ParseErrorKind::MissingChannel,
            ParseError::DuplicateChannel(_) => ParseErrorKind::DuplicateChannel,
            ParseError::InvalidEncoding { .. } => ParseErrorKind::InvalidEncoding,
        }
    }
}
