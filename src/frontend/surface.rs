//! Display surface backing the egui panels
//!
//! [`PlotSurface`] receives callbacks from the event dispatcher and keeps just
//! what the panels draw: the latest window per channel, a bounded log of
//! text lines and the most recent loop counters.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Local};

use crate::backend::{ChannelWindow, DisplaySurface};
use crate::config::settings::DEFAULT_LOG_CAPACITY;
use crate::types::{AcquisitionStats, SensorChannel};

/// Severity of a log view entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Device,
    Status,
    Error,
}

/// One line of the log view
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Local arrival time, unrelated to sample timestamps
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub text: String,
}

impl LogEntry {
    pub fn formatted(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S%.3f"), self.text)
    }
}

/// UI-side sink for [`DisplaySurface`] callbacks
pub struct PlotSurface {
    windows: BTreeMap<SensorChannel, ChannelWindow>,
    log: VecDeque<LogEntry>,
    log_capacity: usize,
    stats: AcquisitionStats,
    last_error: Option<String>,
    open_port: Option<String>,
    /// Plots are held while paused
    frozen: bool,
}

impl Default for PlotSurface {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl PlotSurface {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            windows: BTreeMap::new(),
            log: VecDeque::new(),
            log_capacity: log_capacity.max(1),
            stats: AcquisitionStats::default(),
            last_error: None,
            open_port: None,
            frozen: false,
        }
    }

    pub fn windows(&self) -> impl ExactSizeIterator<Item = &ChannelWindow> {
        self.windows.values()
    }

    pub fn window(&self, channel: SensorChannel) -> Option<&ChannelWindow> {
        self.windows.get(&channel)
    }

    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn open_port(&self) -> Option<&str> {
        self.open_port.as_deref()
    }

    /// Stop replacing plotted windows until unfrozen
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Append a status line that did not come from the device
    pub fn push_status(&mut self, text: impl Into<String>) {
        self.push(LogKind::Status, text.into());
    }

    fn push(&mut self, kind: LogKind, text: String) {
        self.log.push_back(LogEntry {
            at: Local::now(),
            kind,
            text,
        });
        self.trim_log();
    }

    fn trim_log(&mut self) {
        while self.log.len() > self.log_capacity {
            self.log.pop_front();
        }
    }
}

impl DisplaySurface for PlotSurface {
    fn on_line(&mut self, text: &str) {
        self.push(LogKind::Device, text.to_string());
    }

    fn on_sample_window(&mut self, channel: SensorChannel, window: &ChannelWindow) {
        if !self.frozen {
            self.windows.insert(channel, window.clone());
        }
    }

    fn on_port_opened(&mut self, port: &str) {
        self.open_port = Some(port.to_string());
        self.last_error = None;
        self.push(LogKind::Status, format!("Port {} opened.", port));
    }

    fn on_port_closed(&mut self, port: &str) {
        self.open_port = None;
        self.push(LogKind::Status, format!("Port {} closed.", port));
    }

    fn on_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.push(LogKind::Error, message.to_string());
    }

    fn on_stats(&mut self, stats: &AcquisitionStats) {
        self.stats = stats.clone();
    }

    fn on_cleared(&mut self, log: bool) {
        self.windows.clear();
        if log {
            self.log.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn window(channel: SensorChannel, value: i32) -> ChannelWindow {
        ChannelWindow {
            channel,
            first_index: 0,
            timestamps: vec![Duration::ZERO],
            axes: [vec![value], vec![value], vec![value]],
        }
    }

    #[test]
    fn test_port_messages() {
        let mut surface = PlotSurface::default();
        surface.on_port_opened("COM3");
        assert_eq!(surface.open_port(), Some("COM3"));
        surface.on_port_closed("COM3");
        assert_eq!(surface.open_port(), None);

        let texts: Vec<_> = surface.log().map(|e| e.text.clone()).collect();
        assert_eq!(texts, vec!["Port COM3 opened.", "Port COM3 closed."]);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut surface = PlotSurface::new(3);
        for i in 0..10 {
            surface.on_line(&format!("line {}", i));
        }
        assert_eq!(surface.log_len(), 3);
        assert_eq!(surface.log().next().unwrap().text, "line 7");
    }

    #[test]
    fn test_frozen_keeps_last_window() {
        let mut surface = PlotSurface::default();
        surface.on_sample_window(SensorChannel::Gyroscope, &window(SensorChannel::Gyroscope, 1));
        surface.set_frozen(true);
        surface.on_sample_window(SensorChannel::Gyroscope, &window(SensorChannel::Gyroscope, 2));
        assert_eq!(surface.window(SensorChannel::Gyroscope).unwrap().axes[0], vec![1]);
    }

    #[test]
    fn test_cleared_keeps_log_unless_asked() {
        let mut surface = PlotSurface::default();
        surface.on_line("hello");
        surface.on_sample_window(SensorChannel::Accelerometer, &window(SensorChannel::Accelerometer, 5));
        surface.on_cleared(false);
        assert_eq!(surface.windows().count(), 0);
        assert_eq!(surface.log_len(), 1);

        surface.on_cleared(true);
        assert_eq!(surface.log_len(), 0);
    }

    #[test]
    fn test_error_is_remembered() {
        let mut surface = PlotSurface::default();
        surface.on_error("No device found on COM9.");
        assert_eq!(surface.last_error(), Some("No device found on COM9."));
        assert_eq!(surface.log().last().unwrap().kind, LogKind::Error);
    }
}
