//! Acquisition backend for the serial plotter
//!
//! Serial reading runs on a background thread so the UI stays responsive.
//! The two sides never share widgets: the background loop posts events to a
//! crossbeam channel and the UI thread drains it.
//!
//! # Architecture
//!
//! - [`LineFramer`] - Splits the port's byte stream into text lines
//! - [`SampleParser`] - Separates telemetry from free text and parses samples
//! - [`TimeSeriesBuffer`] - Column store of samples, shared as [`SharedBuffer`]
//! - [`AcquisitionLoop`] - Background pipeline for one open connection
//! - [`SessionController`] - Owns the connection lifecycle and the loop thread
//! - [`EventDispatcher`] - UI-side pump that turns [`DisplayEvent`]s into
//!   [`DisplaySurface`] callbacks, throttling plot refreshes
//!
//! # Example
//!
//! ```ignore
//! use serial_plotter::backend::{SerialPortOpener, SessionController};
//! use serial_plotter::config::{AppConfig, SerialConfig};
//! use serial_plotter::types::SensorChannel;
//!
//! let config = AppConfig::default();
//! let mut session = SessionController::new(Box::new(SerialPortOpener), config.acquisition.clone());
//! let mut dispatcher = session.dispatcher(config.display.min_repaint_interval());
//!
//! session.open(SerialConfig::new("/dev/ttyUSB0", 115200), &[SensorChannel::Accelerometer])?;
//!
//! // Once per UI frame
//! session.poll();
//! dispatcher.pump(&mut surface, config.display.window_len);
//! ```

pub mod acquisition;
pub mod buffer;
pub mod framer;
pub mod parser;
pub mod session;

pub use acquisition::{AcquisitionLoop, LoopChannels, LoopExit, LoopGuard};
pub use buffer::{shared, BufferView, ChannelWindow, SharedBuffer, TimeSeriesBuffer};
pub use framer::{Frame, LineFramer};
pub use parser::{ParsedLine, SampleParser};
pub use session::{
    CloseOutcome, OpenOutcome, PortOpener, PortStream, SerialPortOpener, SessionController,
};

use crate::error::ParseError;
use crate::types::{AcquisitionStats, SensorChannel};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message posted to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// A line to show in the log view (free text or an accepted telemetry line)
    Line(String),
    /// A line that was discarded by the parser
    ParseError { line: String, error: ParseError },
    /// The buffer grew since the last consumed notification
    SamplesAvailable,
    /// A connection was opened
    PortOpened(String),
    /// A connection was closed, by request or after a fault
    PortClosed(String),
    /// Operator-visible error text
    Error(String),
    /// Running counters of the acquisition loop
    Stats(AcquisitionStats),
    /// The buffer was cleared; `log` is set when the text log goes too
    Cleared { log: bool },
}

/// Where the core pushes data for rendering
///
/// Implemented by the UI. All callbacks run on the UI thread, from
/// [`EventDispatcher::pump`].
pub trait DisplaySurface {
    /// A line of device text
    fn on_line(&mut self, text: &str);

    /// The latest window of one channel
    fn on_sample_window(&mut self, channel: SensorChannel, window: &ChannelWindow);

    fn on_port_opened(&mut self, port: &str);

    fn on_port_closed(&mut self, port: &str);

    fn on_error(&mut self, message: &str);

    /// Loop counters; ignored by default
    fn on_stats(&mut self, _stats: &AcquisitionStats) {}

    /// Buffer and plot state were wiped; `log` asks for the text log as well.
    /// Ignored by default.
    fn on_cleared(&mut self, _log: bool) {}
}

/// Drains the event queue into a [`DisplaySurface`]
///
/// Sample notifications are last-write-wins: however many arrive between two
/// refreshes, the surface gets one window per channel, and never more often
/// than `min_interval`.
pub struct EventDispatcher {
    events: Receiver<DisplayEvent>,
    buffer: SharedBuffer,
    dirty: Arc<AtomicBool>,
    min_interval: Duration,
    last_window: Option<Instant>,
    window_pending: bool,
}

impl EventDispatcher {
    pub fn new(
        events: Receiver<DisplayEvent>,
        buffer: SharedBuffer,
        dirty: Arc<AtomicBool>,
        min_interval: Duration,
    ) -> Self {
        Self {
            events,
            buffer,
            dirty,
            min_interval,
            last_window: None,
            window_pending: false,
        }
    }

    /// Whether a plot refresh is waiting for the throttle to expire
    pub fn has_pending_window(&self) -> bool {
        self.window_pending
    }

    /// Deliver all queued events; returns how many were handled
    pub fn pump(&mut self, surface: &mut dyn DisplaySurface, window_len: usize) -> usize {
        let events: Vec<DisplayEvent> = self.events.try_iter().collect();
        let handled = events.len();

        for event in events {
            self.dispatch(event, surface);
        }

        let due = self
            .last_window
            .map_or(true, |at| at.elapsed() >= self.min_interval);
        if self.window_pending && due {
            self.push_window(surface, window_len);
        }

        handled
    }

    /// Push the current window now, ignoring the throttle
    pub fn refresh(&mut self, surface: &mut dyn DisplaySurface, window_len: usize) {
        self.push_window(surface, window_len);
    }

    fn dispatch(&mut self, event: DisplayEvent, surface: &mut dyn DisplaySurface) {
        match event {
            DisplayEvent::Line(text) => surface.on_line(&text),
            DisplayEvent::ParseError { line, error } => {
                surface.on_line(&format!("{}  [parse error: {}]", line, error));
            }
            DisplayEvent::SamplesAvailable => {
                self.dirty.store(false, Ordering::Release);
                self.window_pending = true;
            }
            DisplayEvent::PortOpened(port) => surface.on_port_opened(&port),
            DisplayEvent::PortClosed(port) => surface.on_port_closed(&port),
            DisplayEvent::Error(message) => surface.on_error(&message),
            DisplayEvent::Stats(stats) => surface.on_stats(&stats),
            DisplayEvent::Cleared { log } => {
                self.window_pending = false;
                surface.on_cleared(log);
            }
        }
    }

    fn push_window(&mut self, surface: &mut dyn DisplaySurface, window_len: usize) {
        // Copy out under the read lock, call the surface without it
        let windows: Vec<ChannelWindow> = {
            let buffer = self.buffer.read();
            let view = buffer.window(window_len);
            buffer
                .channels()
                .iter()
                .filter_map(|channel| view.channel_window(*channel))
                .collect()
        };

        for window in &windows {
            surface.on_sample_window(window.channel, window);
        }

        self.last_window = Some(Instant::now());
        self.window_pending = false;
    }
}
