//! Background acquisition loop
//!
//! One [`AcquisitionLoop`] runs per open connection on its own thread. Each
//! iteration pulls one frame from the [`LineFramer`], classifies it with the
//! [`SampleParser`], appends samples to the shared buffer and posts
//! [`DisplayEvent`]s for the UI thread to drain.
//!
//! # Stopping
//!
//! The stop flag is checked at the top of every iteration and again under
//! the buffer's write lock before each append. Reads use a bounded timeout,
//! so a silent device delays the check by at most one poll interval.
//!
//! # Errors
//!
//! Parse errors never stop the loop; the offending line is forwarded to the
//! display. A stream fault ends the loop with [`LoopExit::Failed`]. The loop
//! never touches the session state; it only reports how it exited.

use super::buffer::SharedBuffer;
use super::framer::{Frame, LineFramer};
use super::parser::{ParsedLine, SampleParser};
use super::DisplayEvent;
use crate::error::{ParseError, PlotterError};
use crate::types::AcquisitionStats;
use crossbeam_channel::Sender;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often running counters are posted to the UI
pub const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// How an acquisition loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop flag was observed
    Stopped,
    /// The stream failed; carries the reason
    Failed(String),
}

/// Counts live acquisition loops for as long as it is held
#[derive(Debug)]
pub struct LoopGuard(Arc<AtomicUsize>);

impl LoopGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handles the loop shares with the session controller
#[derive(Clone)]
pub struct LoopChannels {
    /// Buffer the loop appends to
    pub buffer: SharedBuffer,
    /// Set by the controller to request a stop
    pub stop: Arc<AtomicBool>,
    /// Queue drained by the UI thread
    pub events: Sender<DisplayEvent>,
    /// Set while a `SamplesAvailable` event is queued and not yet consumed
    pub dirty: Arc<AtomicBool>,
}

/// Framer → parser → buffer pipeline for one connection
pub struct AcquisitionLoop<R> {
    port: String,
    framer: LineFramer<R>,
    parser: SampleParser,
    channels: LoopChannels,
    stats: AcquisitionStats,
    last_stats_time: Instant,
    _guard: LoopGuard,
}

impl<R: Read> AcquisitionLoop<R> {
    pub fn new(
        port: impl Into<String>,
        reader: R,
        parser: SampleParser,
        channels: LoopChannels,
        guard: LoopGuard,
    ) -> Self {
        Self {
            port: port.into(),
            framer: LineFramer::new(reader),
            parser,
            channels,
            stats: AcquisitionStats::default(),
            last_stats_time: Instant::now(),
            _guard: guard,
        }
    }

    /// Run until stopped or the stream fails
    pub fn run(mut self) -> LoopExit {
        tracing::info!("Acquisition loop started on {}", self.port);

        let exit = loop {
            if self.stop_requested() {
                break LoopExit::Stopped;
            }

            match self.framer.next_frame() {
                Ok(Frame::Idle) => {}
                Ok(Frame::Line(line)) => {
                    if let Some(exit) = self.handle_line(line) {
                        break exit;
                    }
                }
                Ok(Frame::Undecodable(lossy)) => {
                    self.stats.lines_read += 1;
                    self.report_parse_error(
                        lossy.clone(),
                        ParseError::InvalidEncoding { lossy },
                    );
                }
                Err(e) => {
                    let reason = match e {
                        PlotterError::StreamFault(reason) => reason,
                        other => other.to_string(),
                    };
                    tracing::error!("Stream fault on {}: {}", self.port, reason);
                    break LoopExit::Failed(reason);
                }
            }

            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.send_stats();
            }
        };

        self.send_stats();
        tracing::info!(
            "Acquisition loop on {} exited ({:?}): {} lines, {} samples, {} parse errors",
            self.port,
            exit,
            self.stats.lines_read,
            self.stats.samples_appended,
            self.stats.parse_errors
        );
        exit
    }

    fn stop_requested(&self) -> bool {
        self.channels.stop.load(Ordering::SeqCst)
    }

    /// Returns an exit if the stop flag was seen while appending
    fn handle_line(&mut self, line: String) -> Option<LoopExit> {
        self.stats.lines_read += 1;

        match self.parser.parse(&line) {
            Ok(ParsedLine::Sample(sample)) => {
                {
                    let mut buffer = self.channels.buffer.write();
                    // close() takes this lock after raising the flag
                    if self.stop_requested() {
                        return Some(LoopExit::Stopped);
                    }
                    if let Err(e) = buffer.append(sample) {
                        drop(buffer);
                        tracing::warn!("Dropping sample: {}", e);
                        let _ = self.channels.events.send(DisplayEvent::Error(e.to_string()));
                        return None;
                    }
                }
                self.stats.samples_appended += 1;
                let _ = self.channels.events.send(DisplayEvent::Line(line));
                self.notify_samples();
            }
            Ok(ParsedLine::Info(text)) => {
                self.stats.info_lines += 1;
                let _ = self.channels.events.send(DisplayEvent::Line(text));
            }
            Err(error) => self.report_parse_error(line, error),
        }
        None
    }

    fn report_parse_error(&mut self, line: String, error: ParseError) {
        self.stats.parse_errors += 1;
        tracing::debug!("Discarding line {:?}: {}", line, error);
        let _ = self
            .channels
            .events
            .send(DisplayEvent::ParseError { line, error });
    }

    /// Post `SamplesAvailable` unless one is already waiting to be consumed
    fn notify_samples(&self) {
        if !self.channels.dirty.swap(true, Ordering::AcqRel) {
            let _ = self.channels.events.send(DisplayEvent::SamplesAvailable);
        }
    }

    fn send_stats(&mut self) {
        self.stats.bytes_read = self.framer.bytes_read();
        let _ = self
            .channels
            .events
            .send(DisplayEvent::Stats(self.stats.clone()));
        self.last_stats_time = Instant::now();
    }
}
