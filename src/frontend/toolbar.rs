//! Toolbar panel: connection settings, channel selection and commands.
//!
//! Sits at the top of the window. Settings are editable only while no port is
//! open.

use egui::{Color32, RichText, Ui};

use crate::config::settings::{RuntimeSettings, MAX_WINDOW_LEN, MIN_WINDOW_LEN};
use crate::config::{DataBits, Parity, StopBits, STANDARD_BAUD_RATES};
use crate::frontend::state::{AppAction, ConnectionForm};
use crate::types::{AcquisitionState, SensorChannel};

/// Context needed to render the toolbar.
pub struct ToolbarContext<'a> {
    pub state: &'a AcquisitionState,
    pub settings: &'a RuntimeSettings,
    pub last_export_dir: Option<&'a std::path::Path>,
}

/// Render the main application toolbar.
///
/// Edits go straight into `form`; commands come back as actions.
pub fn render_toolbar(
    ui: &mut Ui,
    form: &mut ConnectionForm,
    ctx: &ToolbarContext<'_>,
) -> Vec<AppAction> {
    let mut actions = Vec::new();
    let running = ctx.state.is_running();

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 4.0;

        ui.add_enabled_ui(!running, |ui| {
            render_port_group(ui, form, &mut actions);
            ui.separator();
            render_line_group(ui, form);
            ui.separator();
            render_channel_group(ui, form);
        });

        ui.separator();
        render_command_group(ui, form, ctx, &mut actions);

        ui.separator();
        render_view_group(ui, ctx, &mut actions);
    });

    actions
}

fn render_port_group(ui: &mut Ui, form: &mut ConnectionForm, actions: &mut Vec<AppAction>) {
    ui.label("Port:");
    egui::ComboBox::from_id_salt("toolbar_port_selector")
        .selected_text(form.serial.port.as_str())
        .width(140.0)
        .show_ui(ui, |ui| {
            if form.available_ports.is_empty() {
                ui.label("No ports found");
            }
            for port in form.available_ports.clone() {
                ui.selectable_value(&mut form.serial.port, port.clone(), port);
            }
            ui.separator();
            if ui.button("Refresh").clicked() {
                actions.push(AppAction::RefreshPorts);
            }
        });

    // Ports that do not enumerate (virtual, remote) can be typed in
    ui.add(
        egui::TextEdit::singleline(&mut form.serial.port)
            .hint_text("Port name")
            .desired_width(110.0),
    );
}

fn render_line_group(ui: &mut Ui, form: &mut ConnectionForm) {
    egui::ComboBox::from_id_salt("toolbar_baud")
        .selected_text(form.serial.baud_rate.to_string())
        .width(80.0)
        .show_ui(ui, |ui| {
            for baud in STANDARD_BAUD_RATES {
                ui.selectable_value(&mut form.serial.baud_rate, *baud, baud.to_string());
            }
        });

    egui::ComboBox::from_id_salt("toolbar_data_bits")
        .selected_text(format!("{} bits", form.serial.data_bits))
        .width(60.0)
        .show_ui(ui, |ui| {
            for bits in DataBits::all() {
                ui.selectable_value(&mut form.serial.data_bits, *bits, bits.to_string());
            }
        });

    egui::ComboBox::from_id_salt("toolbar_parity")
        .selected_text(form.serial.parity.name())
        .width(70.0)
        .show_ui(ui, |ui| {
            for parity in Parity::all() {
                let response = ui.selectable_value(&mut form.serial.parity, *parity, parity.name());
                if parity.to_serialport().is_none() {
                    let _ = response.on_hover_text("Not supported by the serial driver");
                }
            }
        });

    egui::ComboBox::from_id_salt("toolbar_stop_bits")
        .selected_text(format!("{} stop", form.serial.stop_bits))
        .width(60.0)
        .show_ui(ui, |ui| {
            for stop in StopBits::all() {
                ui.selectable_value(&mut form.serial.stop_bits, *stop, stop.to_string());
            }
        });
}

fn render_channel_group(ui: &mut Ui, form: &mut ConnectionForm) {
    for channel in SensorChannel::all() {
        let mut selected = form.is_selected(*channel);
        if ui.checkbox(&mut selected, channel.prefix()).changed() {
            form.set_selected(*channel, selected);
        }
    }
}

fn render_command_group(
    ui: &mut Ui,
    form: &ConnectionForm,
    ctx: &ToolbarContext<'_>,
    actions: &mut Vec<AppAction>,
) {
    if ctx.state.is_running() {
        ui.colored_label(Color32::GREEN, "●");
        let btn = egui::Button::new(RichText::new("CLOSE").color(Color32::WHITE))
            .fill(Color32::from_rgb(180, 50, 50));
        if ui.add(btn).on_hover_text("Close the serial port").clicked() {
            actions.push(AppAction::Close);
        }
    } else {
        let color = match ctx.state {
            AcquisitionState::Failed(_) => Color32::RED,
            _ => Color32::GRAY,
        };
        ui.colored_label(color, "●");
        let can_open = !form.serial.port.is_empty() && !form.channels.is_empty();
        let btn = egui::Button::new(RichText::new("OPEN").color(Color32::WHITE))
            .fill(Color32::from_rgb(50, 120, 50));
        if ui
            .add_enabled(can_open, btn)
            .on_hover_text("Open the serial port")
            .clicked()
        {
            actions.push(AppAction::Open);
        }
    }

    if ui
        .button("SAVE")
        .on_hover_text("Export all samples to CSV")
        .clicked()
    {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Save samples")
            .set_file_name("samples.csv")
            .add_filter("CSV", &["csv"])
            .add_filter("Text", &["txt"])
            .add_filter("All Files", &["*"]);
        if let Some(dir) = ctx.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.save_file() {
            actions.push(AppAction::Save(path));
        }
    }

    if ui
        .button("CLEAR")
        .on_hover_text("Clear samples, plots and log")
        .clicked()
    {
        actions.push(AppAction::Clear);
    }
}

fn render_view_group(ui: &mut Ui, ctx: &ToolbarContext<'_>, actions: &mut Vec<AppAction>) {
    let pause_text = if ctx.settings.paused { "Resume" } else { "Pause" };
    if ui
        .button(pause_text)
        .on_hover_text("Freeze the plot; acquisition keeps running")
        .clicked()
    {
        actions.push(AppAction::TogglePause);
    }

    ui.label("Window:");
    let mut window_len = ctx.settings.window_len;
    let response = ui.add(
        egui::DragValue::new(&mut window_len)
            .range(MIN_WINDOW_LEN..=MAX_WINDOW_LEN)
            .suffix(" samples"),
    );
    if response.changed() {
        actions.push(AppAction::SetWindowLen(window_len));
    }
}
