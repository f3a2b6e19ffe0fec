//! Live plots with egui_plot
//!
//! One plot per selected channel, stacked vertically, each drawing one line
//! per axis over the latest window. X is sample time in seconds
//! (`index × timebase`); Y is the channel's configured display range unless
//! the operator switched to fitting the data.

use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotBounds, PlotPoints};

use crate::backend::ChannelWindow;
use crate::config::settings::RuntimeSettings;
use crate::config::DisplayConfig;
use crate::types::AXIS_COUNT;

/// Line colors for the x/y/z axes
const AXIS_COLORS: [Color32; AXIS_COUNT] = [
    Color32::from_rgb(230, 80, 80),
    Color32::from_rgb(80, 200, 120),
    Color32::from_rgb(90, 140, 240),
];

/// Render one plot per channel window, sharing the available height
pub fn render_plots<'a>(
    ui: &mut Ui,
    windows: impl ExactSizeIterator<Item = &'a ChannelWindow>,
    display: &DisplayConfig,
    settings: &RuntimeSettings,
) {
    let count = windows.len();
    if count == 0 {
        ui.centered_and_justified(|ui| {
            ui.label("No samples yet. Open a port to start plotting.");
        });
        return;
    }

    let spacing = ui.spacing().item_spacing.y;
    let height = ((ui.available_height() - spacing * (count as f32 - 1.0)) / count as f32).max(80.0);

    for window in windows {
        render_channel_plot(ui, window, display, settings, height);
    }
}

fn render_channel_plot(
    ui: &mut Ui,
    window: &ChannelWindow,
    display: &DisplayConfig,
    settings: &RuntimeSettings,
    height: f32,
) {
    let channel = window.channel;
    let fixed_range = if settings.fixed_y_range {
        display.range_for(channel)
    } else {
        None
    };

    let mut plot = Plot::new(format!("plot_{}", channel.key()))
        .height(height)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show_axes(true)
        .x_axis_label("Time (s)")
        .y_axis_label(channel.display_name())
        .auto_bounds([false, false]);

    if settings.show_legend {
        plot = plot.legend(
            Legend::default()
                .position(Corner::LeftTop)
                .background_alpha(0.8),
        );
    }

    let x_bounds = x_bounds(window);
    let labels = channel.axis_labels();

    let (y_min, y_max) = fixed_range.unwrap_or_else(|| fitted_y_bounds(window));

    plot.show(ui, |plot_ui| {
        plot_ui.set_plot_bounds(PlotBounds::from_min_max(
            [x_bounds.0, y_min],
            [x_bounds.1, y_max],
        ));

        for axis in 0..AXIS_COUNT {
            let points = PlotPoints::from(window.plot_points(axis));
            let line = Line::new(format!("{} {}", channel.prefix(), labels[axis]), points)
                .color(AXIS_COLORS[axis])
                .width(1.5);
            plot_ui.line(line);
        }
    });
}

/// X range of a window, never empty
fn x_bounds(window: &ChannelWindow) -> (f64, f64) {
    let first = window.timestamps.first().map_or(0.0, |t| t.as_secs_f64());
    let last = window.timestamps.last().map_or(1.0, |t| t.as_secs_f64());
    if last > first {
        (first, last)
    } else {
        (first, first + 1.0)
    }
}

/// Y range covering every axis of a window, with a small margin
fn fitted_y_bounds(window: &ChannelWindow) -> (f64, f64) {
    let mut values = window.axes.iter().flatten().copied();
    let Some(first) = values.next() else {
        return (-1.0, 1.0);
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (min, max) = (min as f64, max as f64);
    let margin = ((max - min) * 0.05).max(1.0);
    (min - margin, max + margin)
}
