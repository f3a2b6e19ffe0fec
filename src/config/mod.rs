//! Configuration module for the serial plotter
//!
//! This module handles application configuration including:
//! - The serial line settings snapshot taken when a port is opened ([`SerialConfig`])
//! - Acquisition and display tuning loaded from an optional TOML file ([`AppConfig`])
//! - Application state persistence (last used port settings, export directory)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.serial-plotter/`
//! - **macOS**: `~/Library/Application Support/dev.serial-plotter/`
//! - **Windows**: `%APPDATA%\dev.serial-plotter\`
//!
//! # Files
//!
//! - `app_state.json` - Last used serial settings and export directory
//! - `logs/` - Daily rolling log files
//! - `serial-plotter.toml` - Optional tuning file, read from the working directory
//!   or from the path passed as the first command-line argument
//!
//! # Example
//!
//! ```ignore
//! use serial_plotter::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default("serial-plotter.toml");
//! let mut state = AppState::load_or_default();
//! state.last_serial = Some(config.serial.clone());
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{PlotterError, Result, ResultExt};
use crate::types::SensorChannel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.serial-plotter";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Default tuning file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "serial-plotter.toml";

/// Baud rates offered by the connection toolbar, in menu order
pub const STANDARD_BAUD_RATES: &[u32] = &[
    115_200, 57_600, 38_400, 19_200, 9_600, 1_200, 300, 921_600, 460_800, 230_400, 4_800, 2_400,
    150, 110,
];

/// Default nominal tick between samples in milliseconds
pub const DEFAULT_TIMEBASE_MS: u64 = 100;

/// Default read timeout used to poll the stop flag, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default bound on how long `close()` waits for the loop, in milliseconds
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 2_000;

/// Default number of samples in the live plot window
pub const DEFAULT_WINDOW_LEN: usize = 50;

/// Default ceiling on plot refreshes per second
pub const DEFAULT_MAX_REPAINT_HZ: u32 = 30;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        PlotterError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            PlotterError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Directory for rolling log files
pub fn log_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join("logs"))
}

// ==================== Serial Line Settings ====================

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    /// Get all options, in menu order
    pub fn all() -> &'static [DataBits] {
        &[DataBits::Eight, DataBits::Seven, DataBits::Six, DataBits::Five]
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("data bits must be 5..=8, got {}", other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(value: DataBits) -> Self {
        value.as_u8()
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl std::fmt::Display for DataBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Get all options, in menu order
    pub fn all() -> &'static [Parity] {
        &[Parity::None, Parity::Odd, Parity::Even, Parity::Mark, Parity::Space]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Parity::None => "NONE",
            Parity::Odd => "ODD",
            Parity::Even => "EVEN",
            Parity::Mark => "MARK",
            Parity::Space => "SPACE",
        }
    }

    /// Map to the driver's parity, if the driver can express it
    ///
    /// The `serialport` crate only exposes none/odd/even.
    pub fn to_serialport(self) -> Option<serialport::Parity> {
        match self {
            Parity::None => Some(serialport::Parity::None),
            Parity::Odd => Some(serialport::Parity::Odd),
            Parity::Even => Some(serialport::Parity::Even),
            Parity::Mark | Parity::Space => None,
        }
    }
}

impl std::str::FromStr for Parity {
    type Err = String;

    /// Only the first letter is significant: `"e"`, `"EVEN"` and `"Eve"` are all even
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('N') => Ok(Parity::None),
            Some('O') => Ok(Parity::Odd),
            Some('E') => Ok(Parity::Even),
            Some('M') => Ok(Parity::Mark),
            Some('S') => Ok(Parity::Space),
            _ => Err(format!("unknown parity '{}'", s)),
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    pub fn all() -> &'static [StopBits] {
        &[StopBits::One, StopBits::Two]
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("stop bits must be 1 or 2, got {}", other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(value: StopBits) -> Self {
        value.as_u8()
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl std::fmt::Display for StopBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Serial line settings, captured once when a port is opened
///
/// The toolbar edits its own copy; an open connection keeps the snapshot it
/// was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port identifier (`COM3`, `/dev/ttyUSB0`, ...)
    pub port: String,
    pub baud_rate: u32,
    #[serde(default)]
    pub data_bits: DataBits,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub stop_bits: StopBits,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port_name().to_string(),
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

fn default_port_name() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else {
        "/dev/ttyUSB0"
    }
}

impl SerialConfig {
    /// Create a config for a port with default line settings
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Check the fields that the type system cannot
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(PlotterError::Config("port name is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(PlotterError::Config("baud rate must be positive".to_string()));
        }
        Ok(())
    }

    /// Short form like `115200 8N1`
    pub fn line_settings(&self) -> String {
        format!(
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.name().chars().next().unwrap_or('N'),
            self.stop_bits
        )
    }
}

/// List serial port names reported by the OS
///
/// Enumeration errors are logged and produce an empty list; the port name
/// stays editable in the toolbar either way.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => {
            let mut names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
            names.sort();
            names
        }
        Err(e) => {
            tracing::warn!("Port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

// ==================== Acquisition / Display Tuning ====================

/// Settings consumed by the acquisition loop and session controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Nominal tick between samples
    pub timebase_ms: u64,
    /// Read timeout; the stop flag is checked at least this often
    pub poll_interval_ms: u64,
    /// Upper bound on how long `close()` waits for the loop to exit
    pub join_timeout_ms: u64,
    /// Keep only the newest N samples; `None` keeps the whole session
    pub retention_cap: Option<usize>,
    /// Channels every telemetry line must carry, in column order
    pub channels: Vec<SensorChannel>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            timebase_ms: DEFAULT_TIMEBASE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            retention_cap: None,
            channels: vec![SensorChannel::Accelerometer],
        }
    }
}

impl AcquisitionConfig {
    pub fn timebase(&self) -> Duration {
        Duration::from_millis(self.timebase_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// Display value range of one channel, used for plot scaling only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub channel: SensorChannel,
    pub min: f64,
    pub max: f64,
}

/// Settings for the display surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Samples shown in the live plot
    pub window_len: usize,
    /// Ceiling on sample-window notifications per second
    pub max_repaint_hz: u32,
    pub channel_ranges: Vec<ChannelRange>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            max_repaint_hz: DEFAULT_MAX_REPAINT_HZ,
            channel_ranges: vec![
                ChannelRange {
                    channel: SensorChannel::Accelerometer,
                    min: -2048.0,
                    max: 2048.0,
                },
                ChannelRange {
                    channel: SensorChannel::Gyroscope,
                    min: -32768.0,
                    max: 32768.0,
                },
                ChannelRange {
                    channel: SensorChannel::Encoders,
                    min: 0.0,
                    max: 4096.0,
                },
            ],
        }
    }
}

impl DisplayConfig {
    /// Get the display range for a channel, if configured
    pub fn range_for(&self, channel: SensorChannel) -> Option<(f64, f64)> {
        self.channel_ranges
            .iter()
            .find(|r| r.channel == channel)
            .map(|r| (r.min, r.max))
    }

    /// Minimum spacing between two sample-window notifications
    pub fn min_repaint_interval(&self) -> Duration {
        if self.max_repaint_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(1_000_000 / self.max_repaint_hz as u64)
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub acquisition: AcquisitionConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlotterError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            PlotterError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, returning defaults if the file is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| PlotterError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PlotterError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.serial.validate()?;
        if self.acquisition.channels.is_empty() {
            return Err(PlotterError::Config(
                "at least one sensor channel must be selected".to_string(),
            ));
        }
        if self.acquisition.timebase_ms == 0 {
            return Err(PlotterError::Config("timebase must be positive".to_string()));
        }
        if self.acquisition.retention_cap == Some(0) {
            return Err(PlotterError::Config("retention cap must be positive".to_string()));
        }
        Ok(())
    }
}

// ==================== App State ====================

/// Settings remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    /// Format version
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Serial settings of the last successful open
    #[serde(default)]
    pub last_serial: Option<SerialConfig>,

    /// Channels selected at the last open
    #[serde(default)]
    pub last_channels: Vec<SensorChannel>,

    /// Directory of the last CSV export
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_serial: None,
            last_channels: Vec::new(),
            last_export_dir: None,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            PlotterError::Config("Could not determine app state path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load app state from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PlotterError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| PlotterError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir().context("Cannot save app state")?;
        let path = dir.join(APP_STATE_FILE);
        self.save_to(&path)
            .with_context(|| format!("Saving app state to {:?}", path))
    }

    /// Save app state to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PlotterError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| PlotterError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Remember the settings of a successful open
    pub fn remember_connection(&mut self, serial: &SerialConfig, channels: &[SensorChannel]) {
        self.last_serial = Some(serial.clone());
        self.last_channels = channels.to_vec();
    }

    /// Apply remembered settings on top of a loaded config
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(serial) = &self.last_serial {
            config.serial = serial.clone();
        }
        if !self.last_channels.is_empty() {
            config.acquisition.channels = self.last_channels.clone();
        }
    }
}
