//! UI-side state and action types
//!
//! Panels borrow state and return [`AppAction`]s instead of talking to the
//! session directly; the app applies them in one place after rendering.

use std::path::PathBuf;

use crate::config::{AppConfig, SerialConfig};
use crate::types::SensorChannel;

/// Actions the panels can emit
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Open the port described by the connection form
    Open,
    /// Close the running connection
    Close,
    /// Export the whole buffer to a CSV file
    Save(PathBuf),
    /// Wipe samples, plots and the log view
    Clear,
    /// Re-enumerate serial ports
    RefreshPorts,
    /// Freeze or unfreeze the plot
    TogglePause,
    /// Change the number of plotted samples
    SetWindowLen(usize),
}

/// Connection settings being edited in the toolbar
///
/// Only copied into a [`SerialConfig`] snapshot when the operator presses
/// OPEN; edits never reach a running connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionForm {
    pub serial: SerialConfig,
    pub channels: Vec<SensorChannel>,
    pub available_ports: Vec<String>,
}

impl ConnectionForm {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            serial: config.serial.clone(),
            channels: config.acquisition.channels.clone(),
            available_ports: Vec::new(),
        }
    }

    /// Snapshot taken at open time
    pub fn snapshot(&self) -> (SerialConfig, Vec<SensorChannel>) {
        // Keep display order regardless of click order
        let channels = SensorChannel::all()
            .iter()
            .copied()
            .filter(|c| self.channels.contains(c))
            .collect();
        (self.serial.clone(), channels)
    }

    pub fn is_selected(&self, channel: SensorChannel) -> bool {
        self.channels.contains(&channel)
    }

    pub fn set_selected(&mut self, channel: SensorChannel, selected: bool) {
        if selected {
            if !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        } else {
            self.channels.retain(|c| *c != channel);
        }
    }

    /// Replace the port list; keeps the typed port name if it is not listed
    pub fn set_available_ports(&mut self, ports: Vec<String>) {
        if self.serial.port.is_empty() {
            if let Some(first) = ports.first() {
                self.serial.port = first.clone();
            }
        }
        self.available_ports = ports;
    }
}
