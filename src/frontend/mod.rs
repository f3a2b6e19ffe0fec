//! Frontend module for egui UI
//!
//! This module is the display surface of the plotter. It never touches the
//! serial port or the acquisition thread directly: once per frame it asks the
//! session to reap finished loops, pumps queued events into [`PlotSurface`]
//! and renders from there.
//!
//! # Main Types
//!
//! - [`PlotterApp`] - Main application state implementing [`eframe::App`]
//! - [`PlotSurface`] - [`DisplaySurface`](crate::backend::DisplaySurface) implementation holding plot windows and the log
//! - [`AppAction`] - Commands emitted by panels and applied by the app
//!
//! # Submodules
//!
//! - `toolbar` - Port, line settings, channel selection, OPEN/CLOSE/SAVE/CLEAR
//! - `plot` - Per-channel plots with egui_plot
//! - `status_bar` - Connection state and loop counters
//! - `surface` - Event sink and log buffer

mod plot;
pub mod state;
mod status_bar;
pub mod surface;
mod toolbar;

pub use state::{AppAction, ConnectionForm};
pub use surface::{LogEntry, LogKind, PlotSurface};

use crate::backend::{
    CloseOutcome, EventDispatcher, OpenOutcome, PortOpener, SessionController,
};
use crate::config::{settings::RuntimeSettings, available_ports, AppConfig, AppState};
use crate::export;
use egui::{Color32, RichText};
use std::path::Path;
use std::time::Duration;

/// Upper bound on how long the UI sleeps while a port is open
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state for the serial plotter
pub struct PlotterApp {
    // === Acquisition ===
    session: SessionController,
    dispatcher: EventDispatcher,

    // === Configuration ===
    config: AppConfig,
    app_state: AppState,
    settings: RuntimeSettings,
    form: ConnectionForm,

    // === Display ===
    surface: PlotSurface,
}

impl PlotterApp {
    /// Create the app with a real serial port opener
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        opener: Box<dyn PortOpener>,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        Self::with_opener(opener, config, app_state)
    }

    /// Build without an egui context
    pub fn with_opener(
        opener: Box<dyn PortOpener>,
        config: AppConfig,
        app_state: AppState,
    ) -> Self {
        let session = SessionController::new(opener, config.acquisition.clone());
        let dispatcher = session.dispatcher(config.display.min_repaint_interval());
        let settings = RuntimeSettings::from_display_config(&config.display);
        let mut form = ConnectionForm::from_config(&config);
        form.set_available_ports(available_ports());

        Self {
            session,
            dispatcher,
            surface: PlotSurface::new(settings.log_capacity),
            config,
            app_state,
            settings,
            form,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn surface(&self) -> &PlotSurface {
        &self.surface
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn form_mut(&mut self) -> &mut ConnectionForm {
        &mut self.form
    }

    /// Reap loops and deliver queued events; returns whether anything arrived
    pub fn process_events(&mut self) -> bool {
        self.session.poll();
        let handled = self.dispatcher.pump(&mut self.surface, self.settings.window_len);
        handled > 0
    }

    /// Apply one panel action
    pub fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Open => self.open(),
            AppAction::Close => self.close(),
            AppAction::Save(path) => self.save(&path),
            // The log is wiped when the queued clear is dispatched, after
            // any lines read before it
            AppAction::Clear => self.session.clear(),
            AppAction::RefreshPorts => {
                let ports = available_ports();
                tracing::debug!("Found {} serial ports", ports.len());
                self.form.set_available_ports(ports);
            }
            AppAction::TogglePause => {
                self.settings.toggle_pause();
                self.surface.set_frozen(self.settings.paused);
                if !self.settings.paused {
                    self.dispatcher.refresh(&mut self.surface, self.settings.window_len);
                }
            }
            AppAction::SetWindowLen(len) => {
                self.settings.set_window_len(len);
                self.dispatcher.refresh(&mut self.surface, self.settings.window_len);
            }
        }
    }

    fn open(&mut self) {
        let (serial, channels) = self.form.snapshot();
        match self.session.open(serial.clone(), &channels) {
            Ok(OpenOutcome::Opened) => {
                self.app_state.remember_connection(&serial, &channels);
            }
            Ok(OpenOutcome::AlreadyOpen) => {}
            // PortUnavailable is already on the event queue as a notice
            Err(crate::error::PlotterError::PortUnavailable { .. }) => {}
            Err(e) => self.surface.push_status(format!("Open failed: {}", e)),
        }
    }

    fn close(&mut self) {
        match self.session.close() {
            Ok(CloseOutcome::Closed) | Ok(CloseOutcome::NotRunning) => {}
            Err(e) => {
                tracing::warn!("Close: {}", e);
                self.surface.push_status(e.to_string());
            }
        }
    }

    fn save(&mut self, path: &Path) {
        // Export from a copy so the acquisition loop never waits on the disk
        let snapshot = self.session.buffer().read().clone();
        match export::export_csv(&snapshot.full(), path) {
            Ok(rows) => {
                self.surface
                    .push_status(format!("Saved {} samples to {}.", rows, path.display()));
                self.app_state.last_export_dir = path.parent().map(Path::to_path_buf);
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                self.surface.push_status(format!("Save failed: {}", e));
            }
        }
    }

    fn render_log(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(self.settings.autoscroll_log)
            .show(ui, |ui| {
                for entry in self.surface.log() {
                    let text = RichText::new(entry.formatted()).monospace();
                    let text = match entry.kind {
                        LogKind::Device => text,
                        LogKind::Status => text.color(Color32::LIGHT_BLUE),
                        LogKind::Error => text.color(Color32::LIGHT_RED),
                    };
                    ui.label(text);
                }
            });
    }
}

impl eframe::App for PlotterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_events = self.process_events();

        if had_events || self.dispatcher.has_pending_window() {
            ctx.request_repaint();
        } else if self.session.is_running() {
            ctx.request_repaint_after(IDLE_REPAINT);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let toolbar_ctx = toolbar::ToolbarContext {
                state: self.session.state(),
                settings: &self.settings,
                last_export_dir: self.app_state.last_export_dir.as_deref(),
            };
            let actions = toolbar::render_toolbar(ui, &mut self.form, &toolbar_ctx);
            for action in actions {
                self.handle_action(action);
            }
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let buffered = self.session.buffer().read().len();
            status_bar::render_status_bar(
                ui,
                &status_bar::StatusBarContext {
                    state: self.session.state(),
                    serial: self.session.serial_config(),
                    stats: self.surface.stats(),
                    buffered,
                    last_error: self.surface.last_error(),
                },
            );
        });

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Log").strong());
                    ui.checkbox(&mut self.settings.autoscroll_log, "Follow");
                    ui.checkbox(&mut self.settings.show_legend, "Legend");
                    ui.checkbox(&mut self.settings.fixed_y_range, "Fixed range");
                });
                ui.separator();
                self.render_log(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            plot::render_plots(ui, self.surface.windows(), &self.config.display, &self.settings);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.session.close() {
            tracing::warn!("Failed to close session on exit: {}", e);
        }

        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PortStream;
    use crate::config::SerialConfig;
    use crate::error::{PlotterError, Result};
    use crate::types::{AcquisitionState, ParsedSample, Reading, SensorChannel};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct NoDevice;

    impl PortOpener for NoDevice {
        fn open(&self, config: &SerialConfig, _read_timeout: Duration) -> Result<PortStream> {
            Err(PlotterError::port_unavailable(&config.port, "not found"))
        }
    }

    /// Hands out one stream, then reports the port busy
    struct OneStream(Mutex<Option<PortStream>>);

    impl PortOpener for OneStream {
        fn open(&self, config: &SerialConfig, _read_timeout: Duration) -> Result<PortStream> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| PlotterError::port_unavailable(&config.port, "busy"))
        }
    }

    fn app() -> PlotterApp {
        PlotterApp::with_opener(Box::new(NoDevice), AppConfig::default(), AppState::default())
    }

    #[test]
    fn test_open_failure_shows_notice() {
        let mut app = app();
        app.form_mut().serial.port = "COM7".into();
        app.handle_action(AppAction::Open);
        app.process_events();

        assert_eq!(app.session().state(), &AcquisitionState::Idle);
        assert_eq!(app.surface().last_error(), Some("No device found on COM7."));
    }

    #[test]
    fn test_clear_empties_log() {
        let mut app = app();
        app.surface.push_status("hello");
        app.handle_action(AppAction::Clear);
        app.process_events();
        assert_eq!(app.surface().log_len(), 0);
    }

    #[test]
    fn test_clear_drops_lines_queued_before_it() {
        let stream: PortStream =
            Box::new(Cursor::new(b"old line 1\nold line 2\nAccel: [1,2,3]\n".to_vec()));
        let mut app = PlotterApp::with_opener(
            Box::new(OneStream(Mutex::new(Some(stream)))),
            AppConfig::default(),
            AppState::default(),
        );
        app.form_mut().serial.port = "COM5".into();
        app.handle_action(AppAction::Open);

        let buffer = app.session().buffer();
        for _ in 0..200 {
            if buffer.read().len() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(buffer.read().len(), 1);

        // Both text lines are still queued when the operator clears
        app.handle_action(AppAction::Clear);
        app.process_events();

        assert!(app.surface().log().all(|e| !e.text.starts_with("old line")));
        assert!(app.session().buffer().read().is_empty());
    }

    #[test]
    fn test_save_writes_all_samples() {
        let mut app = app();
        {
            let buffer = app.session().buffer();
            let mut buffer = buffer.write();
            for i in 0..3 {
                buffer
                    .append(ParsedSample::new(vec![Reading::new(
                        SensorChannel::Accelerometer,
                        [i, -i, 100],
                    )]))
                    .unwrap();
            }
        }
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.csv");

        app.handle_action(AppAction::Save(path.clone()));

        let table = export::read_csv(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2], vec![2, -2, 100]);
        assert_eq!(app.app_state.last_export_dir.as_deref(), Some(dir.path()));
        assert!(app
            .surface()
            .log()
            .any(|e| e.text.starts_with("Saved 3 samples")));
    }

    #[test]
    fn test_pause_and_window_len() {
        let mut app = app();
        app.handle_action(AppAction::TogglePause);
        assert!(app.settings().paused);
        app.handle_action(AppAction::SetWindowLen(1));
        assert_eq!(app.settings().window_len, crate::config::settings::MIN_WINDOW_LEN);
    }
}
