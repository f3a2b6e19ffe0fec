//! Connection lifecycle
//!
//! [`SessionController`] is the only owner of [`AcquisitionState`]. It opens
//! the port through a [`PortOpener`], spawns one [`AcquisitionLoop`] thread
//! per connection and tears it down again with a bounded join.
//!
//! # State Machine
//!
//! ```text
//! Idle/Stopped/Failed --open--> Opening --ok--> Running --close--> Stopping --> Stopped
//!                                 |                 |
//!                                 +--err--> Idle    +--stream fault (poll)--> Failed
//! ```
//!
//! `open` while running reports "already open" and leaves the running loop
//! alone. `close` while not running does nothing.

use super::acquisition::{AcquisitionLoop, LoopChannels, LoopExit, LoopGuard};
use super::buffer::{shared, SharedBuffer, TimeSeriesBuffer};
use super::parser::SampleParser;
use super::{DisplayEvent, EventDispatcher};
use crate::config::{AcquisitionConfig, SerialConfig};
use crate::error::{PlotterError, Result};
use crate::types::{AcquisitionState, SensorChannel};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Exit reason when a loop thread ends without reporting
const THREAD_DIED: &str = "acquisition thread died";

/// Byte stream of an open port
pub type PortStream = Box<dyn Read + Send>;

/// Opens serial devices
///
/// The seam between the session and the hardware; tests plug in scripted
/// streams here.
pub trait PortOpener {
    /// Open the port described by `config`; reads must time out after `read_timeout`
    fn open(&self, config: &SerialConfig, read_timeout: Duration) -> Result<PortStream>;
}

/// [`PortOpener`] backed by the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortOpener;

impl PortOpener for SerialPortOpener {
    fn open(&self, config: &SerialConfig, read_timeout: Duration) -> Result<PortStream> {
        config.validate()?;

        let parity = config.parity.to_serialport().ok_or_else(|| {
            PlotterError::port_unavailable(
                &config.port,
                format!("{} parity is not supported by the serial driver", config.parity.name()),
            )
        })?;

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .parity(parity)
            .stop_bits(config.stop_bits.into())
            .timeout(read_timeout)
            .open()
            .map_err(|e| PlotterError::port_unavailable(&config.port, e))?;

        Ok(Box::new(port))
    }
}

/// What `open` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new connection is running
    Opened,
    /// A connection was already running; nothing changed
    AlreadyOpen,
}

/// What `close` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The loop exited and the port was released
    Closed,
    /// Nothing was running
    NotRunning,
}

struct ActiveLoop {
    port: String,
    stop: Arc<AtomicBool>,
    exit_rx: Receiver<LoopExit>,
    handle: JoinHandle<()>,
}

impl ActiveLoop {
    fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("Acquisition thread for {} panicked", self.port);
        }
    }
}

/// Owns the serial connection and its acquisition loop
pub struct SessionController {
    opener: Box<dyn PortOpener>,
    config: AcquisitionConfig,
    state: AcquisitionState,
    buffer: SharedBuffer,
    events_tx: Sender<DisplayEvent>,
    events_rx: Receiver<DisplayEvent>,
    dirty: Arc<AtomicBool>,
    live_loops: Arc<AtomicUsize>,
    active: Option<ActiveLoop>,
    /// A loop that missed its join deadline and has not reported yet
    stalled: Option<ActiveLoop>,
    last_serial: Option<SerialConfig>,
}

impl SessionController {
    pub fn new(opener: Box<dyn PortOpener>, config: AcquisitionConfig) -> Self {
        let (events_tx, events_rx) = unbounded();
        let buffer = shared(
            TimeSeriesBuffer::new(&config.channels, config.timebase())
                .with_retention_cap(config.retention_cap),
        );

        Self {
            opener,
            config,
            state: AcquisitionState::Idle,
            buffer,
            events_tx,
            events_rx,
            dirty: Arc::new(AtomicBool::new(false)),
            live_loops: Arc::new(AtomicUsize::new(0)),
            active: None,
            stalled: None,
            last_serial: None,
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Number of acquisition loops currently alive
    pub fn active_loops(&self) -> usize {
        self.live_loops.load(Ordering::SeqCst)
    }

    pub fn buffer(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    /// Raw event queue, for callers that do not use [`EventDispatcher`]
    pub fn events(&self) -> Receiver<DisplayEvent> {
        self.events_rx.clone()
    }

    /// UI-side pump over this session's events and buffer
    pub fn dispatcher(&self, min_interval: Duration) -> EventDispatcher {
        EventDispatcher::new(
            self.events_rx.clone(),
            self.buffer.clone(),
            self.dirty.clone(),
            min_interval,
        )
    }

    /// Acquisition settings used by the next `open`
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Serial settings of the running (or last) connection
    pub fn serial_config(&self) -> Option<&SerialConfig> {
        self.last_serial.as_ref()
    }

    /// Open a port and start acquiring `channels`
    ///
    /// The configuration is a snapshot: later edits do not reach a running
    /// loop. On failure the session goes back to idle and the display gets
    /// a "No device found" notice.
    pub fn open(
        &mut self,
        serial: SerialConfig,
        channels: &[SensorChannel],
    ) -> Result<OpenOutcome> {
        self.poll();

        if let Some(active) = &self.active {
            tracing::info!("Open requested while {} is already running", active.port);
            self.emit(DisplayEvent::Error(format!(
                "Port {} already open.",
                active.port
            )));
            return Ok(OpenOutcome::AlreadyOpen);
        }
        if self.stalled.is_some() {
            return Err(PlotterError::AlreadyRunning);
        }

        let parser = SampleParser::new(channels);
        if parser.schema().is_empty() {
            return Err(PlotterError::Config("no sensor channel selected".to_string()));
        }

        self.state = AcquisitionState::Opening;
        tracing::info!("Opening {} ({})", serial.port, serial.line_settings());

        let stream = match self.opener.open(&serial, self.config.poll_interval()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", serial.port, e);
                self.state = AcquisitionState::Idle;
                self.emit(DisplayEvent::Error(format!(
                    "No device found on {}.",
                    serial.port
                )));
                return Err(e);
            }
        };

        self.buffer.write().reconfigure(
            parser.schema(),
            self.config.timebase(),
            self.config.retention_cap,
        );
        self.dirty.store(false, Ordering::SeqCst);
        self.emit(DisplayEvent::Cleared { log: false });

        let stop = Arc::new(AtomicBool::new(false));
        let (exit_tx, exit_rx) = bounded(1);
        let acquisition = AcquisitionLoop::new(
            serial.port.clone(),
            stream,
            parser,
            LoopChannels {
                buffer: self.buffer.clone(),
                stop: stop.clone(),
                events: self.events_tx.clone(),
                dirty: self.dirty.clone(),
            },
            LoopGuard::new(self.live_loops.clone()),
        );

        let spawned = std::thread::Builder::new()
            .name(format!("acquisition-{}", serial.port))
            .spawn(move || {
                let exit = acquisition.run();
                let _ = exit_tx.send(exit);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.state = AcquisitionState::Idle;
                return Err(PlotterError::from(e).with_context("Failed to start acquisition thread"));
            }
        };

        self.active = Some(ActiveLoop {
            port: serial.port.clone(),
            stop,
            exit_rx,
            handle,
        });
        self.state = AcquisitionState::Running;
        self.emit(DisplayEvent::PortOpened(serial.port.clone()));
        tracing::info!("Port {} opened", serial.port);
        self.last_serial = Some(serial);

        Ok(OpenOutcome::Opened)
    }

    /// Stop the loop and release the port
    ///
    /// Blocks until the loop has exited or the join timeout passes. Either
    /// way, no sample is appended after this returns.
    pub fn close(&mut self) -> Result<CloseOutcome> {
        let Some(active) = self.active.take() else {
            return Ok(CloseOutcome::NotRunning);
        };

        self.state = AcquisitionState::Stopping;
        active.stop.store(true, Ordering::SeqCst);
        // Appends re-check the flag under the write lock, so once we have
        // held it no further append can land.
        drop(self.buffer.write());

        let timeout = self.config.join_timeout();
        match active.exit_rx.recv_timeout(timeout) {
            Ok(exit) => {
                tracing::debug!("Loop on {} reported {:?}", active.port, exit);
                let port = active.port.clone();
                active.join();
                // The loop may have failed before the stop request reached it
                self.finish(&port, &exit);
                tracing::info!("Port {} closed", port);
                Ok(CloseOutcome::Closed)
            }
            Err(RecvTimeoutError::Disconnected) => {
                let port = active.port.clone();
                active.join();
                self.finish(&port, &LoopExit::Failed(THREAD_DIED.to_string()));
                Ok(CloseOutcome::Closed)
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Loop on {} did not exit within {:?}, detaching",
                    active.port,
                    timeout
                );
                self.emit(DisplayEvent::PortClosed(active.port.clone()));
                self.stalled = Some(active);
                self.state = AcquisitionState::Stopped;
                Err(PlotterError::ShutdownTimeout(timeout))
            }
        }
    }

    /// Reap loops that exited on their own; call once per UI frame
    ///
    /// Returns the exit of a loop that ended without being asked to.
    pub fn poll(&mut self) -> Option<LoopExit> {
        if let Some(stalled) = &self.stalled {
            if !matches!(stalled.exit_rx.try_recv(), Err(TryRecvError::Empty)) {
                if let Some(stalled) = self.stalled.take() {
                    tracing::info!("Detached loop on {} finally exited", stalled.port);
                    stalled.join();
                }
            }
        }

        let exit = match self.active.as_ref()?.exit_rx.try_recv() {
            Ok(exit) => exit,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => LoopExit::Failed(THREAD_DIED.to_string()),
        };

        let active = self.active.take()?;
        let port = active.port.clone();
        active.join();
        self.finish(&port, &exit);

        Some(exit)
    }

    /// Record how a loop ended and tell the display
    fn finish(&mut self, port: &str, exit: &LoopExit) {
        match exit {
            LoopExit::Failed(reason) => {
                self.state = AcquisitionState::Failed(reason.clone());
                self.emit(DisplayEvent::Error(format!(
                    "Connection to {} lost: {}",
                    port, reason
                )));
            }
            LoopExit::Stopped => self.state = AcquisitionState::Stopped,
        }
        self.emit(DisplayEvent::PortClosed(port.to_string()));
    }

    /// Drop all samples and the display's log; the session keeps running
    pub fn clear(&mut self) {
        self.buffer.write().clear();
        self.dirty.store(false, Ordering::SeqCst);
        self.emit(DisplayEvent::Cleared { log: true });
        tracing::info!("Buffer cleared");
    }

    fn emit(&self, event: DisplayEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Session shutdown: {}", e);
        }
    }
}
