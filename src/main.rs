//! Serial Plotter - Main Entry Point
//!
//! Usage: `serial-plotter [CONFIG.toml]`. Without an argument the tuning file
//! is looked up in the working directory.

use serial_plotter::{
    backend::SerialPortOpener,
    config::{log_dir, AppConfig, AppState, CONFIG_FILE_NAME},
    frontend::PlotterApp,
};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install stderr logging plus a daily rolling file when the log dir is writable
fn init_logging() -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,serial_plotter=debug"))
    };

    let file = log_dir().and_then(|dir| match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(tracing_appender::rolling::daily(dir, "serial-plotter.log")),
        Err(e) => {
            eprintln!("Log directory unavailable, file logging disabled: {}", e);
            None
        }
    });

    let (file_layer, guard) = match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    tracing::info!("Starting Serial Plotter");

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut config = AppConfig::load_or_default(&config_path);

    // Last used port settings win over the file
    let app_state = AppState::load_or_default();
    app_state.apply_to(&mut config);

    tracing::info!(
        "Default connection {} {}, channels {:?}",
        config.serial.port,
        config.serial.line_settings(),
        config.acquisition.channels
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0])
            .with_title("Serial Plotter"),
        ..Default::default()
    };

    eframe::run_native(
        "Serial Plotter",
        native_options,
        Box::new(|cc| {
            Ok(Box::new(PlotterApp::new(
                cc,
                Box::new(SerialPortOpener),
                config,
                app_state,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated with an error: {}", e))?;

    tracing::info!("Shutting down");
    Ok(())
}
