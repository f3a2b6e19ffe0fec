//! # Serial Plotter: live telemetry plots from a serial port
//!
//! A desktop tool that opens a serial port, parses the sensor telemetry lines
//! a device streams, buffers the samples and draws them as scrolling plots,
//! with CSV export of the whole session.
//!
//! ## Architecture
//!
//! - **Backend**: framing, parsing and buffering run on one acquisition thread
//!   per open port, owned by a session controller
//! - **Frontend**: renders the UI with eframe/egui and egui_plot; it only reads
//!   buffer snapshots and drains events
//! - **Communication**: a crossbeam channel carries events from the acquisition
//!   thread to the UI; the sample buffer is shared behind a read/write lock
//!
//! ## Configuration
//!
//! Tuning is read from an optional `serial-plotter.toml`. The last used port
//! settings are remembered in the platform data directory under
//! `dev.serial-plotter`:
//!
//! - **Linux**: `~/.local/share/dev.serial-plotter/`
//! - **macOS**: `~/Library/Application Support/dev.serial-plotter/`
//! - **Windows**: `%APPDATA%\dev.serial-plotter\`
//!
//! ## Example
//!
//! ```ignore
//! use serial_plotter::{
//!     backend::SerialPortOpener,
//!     config::{AppConfig, AppState},
//!     frontend::PlotterApp,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let app_state = AppState::load_or_default();
//!     let mut config = AppConfig::load_or_default("serial-plotter.toml");
//!     app_state.apply_to(&mut config);
//!
//!     eframe::run_native(
//!         "Serial Plotter",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| {
//!             Ok(Box::new(PlotterApp::new(
//!                 cc,
//!                 Box::new(SerialPortOpener),
//!                 config,
//!                 app_state,
//!             )))
//!         }),
//!     )
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod frontend;
pub mod types;

// Re-export commonly used types
pub use backend::{DisplayEvent, DisplaySurface, SessionController, TimeSeriesBuffer};
pub use config::{AppConfig, AppState, SerialConfig};
pub use error::{ParseError, PlotterError, Result};
pub use frontend::PlotterApp;
pub use types::{AcquisitionState, Sample, SensorChannel};
