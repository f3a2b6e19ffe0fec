//! Status bar panel: bottom bar showing connection state and loop counters.

use egui::{Color32, RichText, Ui};

use crate::config::SerialConfig;
use crate::types::{AcquisitionState, AcquisitionStats};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub state: &'a AcquisitionState,
    pub serial: Option<&'a SerialConfig>,
    pub stats: &'a AcquisitionStats,
    pub buffered: usize,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === State dot + port ===
        let status_color = match ctx.state {
            AcquisitionState::Running => Color32::GREEN,
            AcquisitionState::Opening | AcquisitionState::Stopping => Color32::YELLOW,
            AcquisitionState::Failed(_) => Color32::RED,
            AcquisitionState::Idle | AcquisitionState::Stopped => Color32::GRAY,
        };
        ui.colored_label(status_color, "●");
        let label = match (ctx.state, ctx.serial) {
            (AcquisitionState::Running, Some(serial)) => {
                format!("{} {}", serial.port, serial.line_settings())
            }
            (state, _) => state.to_string(),
        };
        ui.label(RichText::new(label).small());

        ui.separator();

        let stats = ctx.stats;
        ui.label(RichText::new(format!("Lines: {}", stats.lines_read)).small());
        ui.separator();
        ui.label(RichText::new(format!("Samples: {}", stats.samples_appended)).small());
        ui.separator();

        let error_color = if stats.parse_errors > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            error_color,
            RichText::new(format!(
                "Parse errors: {} ({:.1}% ok)",
                stats.parse_errors,
                stats.parse_success_rate()
            ))
            .small(),
        );
        ui.separator();

        ui.label(RichText::new(format!("Info: {}", stats.info_lines)).small());
        ui.separator();

        let kb = stats.bytes_read as f64 / 1024.0;
        let data_text = if kb > 1024.0 {
            format!("Data: {:.2} MB", kb / 1024.0)
        } else {
            format!("Data: {:.2} KB", kb)
        };
        ui.label(RichText::new(data_text).small());
        ui.separator();

        ui.label(RichText::new(format!("Buffered: {}", ctx.buffered)).small());

        // === Error message (right-aligned) ===
        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
