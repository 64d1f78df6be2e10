use std::time::Instant;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::correlate::CorrelationMode;
use crate::data::model::{PredictionResult, month_label};
use crate::data::store::Collection;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – upload, results, filters, layers
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            upload_section(ui, state);
            ui.separator();
            filter_section(ui, state);
            ui.separator();
            layer_section(ui, state);
        });
}

fn upload_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("1. Identify an animal");

    if ui.button("Choose image…").clicked() {
        open_image_dialog(state);
    }

    if let Some(image) = &state.selected_image {
        ui.label(RichText::new(image.file_name()).weak());
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add(
                egui::Image::from_bytes(image.preview_uri(), image.bytes.clone())
                    .max_width(ui.available_width())
                    .max_height(180.0),
            );
        });
    }

    if ui
        .add_enabled(state.can_upload(), egui::Button::new("Analyze habitat"))
        .clicked()
    {
        state.start_upload();
    }

    if state.loading {
        ui.horizontal(|ui: &mut Ui| {
            ui.spinner();
            ui.label("Analyzing…");
        });
    }

    if let Some(msg) = &state.error_message {
        ui.label(RichText::new(msg).color(Color32::RED));
    }

    if let Some(prediction) = &state.prediction {
        ui.add_space(4.0);
        prediction_results(ui, prediction);
    }
}

fn prediction_results(ui: &mut Ui, prediction: &PredictionResult) {
    ui.strong("Prediction");
    egui::Grid::new("prediction_grid")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("Animal:");
            ui.label(RichText::new(&prediction.label).strong());
            ui.end_row();
            ui.label("Confidence:");
            ui.label(prediction.confidence.to_string());
            ui.end_row();
            ui.label("Habitats:");
            ui.label(prediction.matched_locations.len().to_string());
            ui.end_row();
        });

    if let Some(msg) = &prediction.message {
        ui.label(RichText::new(msg).italics());
    }

    if !prediction.top_predictions.is_empty() {
        egui::CollapsingHeader::new("Top predictions")
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                for ranked in &prediction.top_predictions {
                    ui.label(format!("{}  {}", ranked.label, ranked.probability));
                }
            });
    }
}

fn filter_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("2. Wildfire filters");

    let range = state.year_range;
    let mut year = state.raw_filters.year;
    if ui
        .add(egui::Slider::new(&mut year, range.min..=range.max).text("Year"))
        .changed()
    {
        state.set_year(year, Instant::now());
    }

    let mut month = state.raw_filters.month;
    egui::ComboBox::from_id_salt("month")
        .selected_text(month_label(month))
        .show_ui(ui, |ui: &mut Ui| {
            for m in 0..=12 {
                ui.selectable_value(&mut month, m, month_label(m));
            }
        });
    if month != state.raw_filters.month {
        if let Err(e) = state.set_month(month, Instant::now()) {
            log::warn!("{e}");
        }
    }

    if state.filters_settling() {
        ui.label(RichText::new("Updating…").weak());
    }

    if let Some(covered) = state.store.event_years() {
        ui.label(
            RichText::new(format!("Data covers {}–{}", covered.min, covered.max)).weak(),
        );
    }
}

fn layer_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Layers");
    ui.checkbox(&mut state.show_habitats, "Animal habitats");
    ui.checkbox(&mut state.show_events, "Wildfires");

    egui::CollapsingHeader::new("Wildfire colours")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for (label, color) in state.palette.legend_entries() {
                ui.label(RichText::new(format!("● {label}")).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top status bar.
pub fn top_bar(ui: &mut Ui, state: &AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        let mode = match state.mode() {
            CorrelationMode::Habitat { .. } => "Habitat analysis",
            CorrelationMode::Exploration => "Exploration",
        };
        ui.strong(mode);
        ui.separator();

        ui.label(format!(
            "{} habitats, {} wildfires shown",
            state.display.locations.len(),
            state.display.events.len()
        ));
        ui.separator();

        ui.label(dataset_status("Parks", &state.store.locations));
        ui.label(dataset_status("Fires", &state.store.events));
        ui.separator();

        ui.label(format!("zoom {:.1}", state.view.zoom()));

        for failure in state.store.failures() {
            ui.label(RichText::new(failure).color(Color32::RED));
        }
    });
}

fn dataset_status<T>(name: &str, collection: &Collection<T>) -> String {
    match collection {
        Collection::Pending => format!("{name}: loading…"),
        Collection::Ready(records) => format!("{name}: {}", records.len()),
        Collection::Failed(_) => format!("{name}: unavailable"),
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_image_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Choose an animal photo")
        .add_filter("Images", &["png", "jpg", "jpeg"])
        .pick_file();

    if let Some(path) = file {
        state.select_image(&path);
    }
}
