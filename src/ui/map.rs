use std::collections::BTreeMap;

use eframe::egui::Ui;
use egui_plot::{Legend, MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points};

use crate::color::HABITAT_COLOR;
use crate::data::model::{DisplaySet, GeoPoint, month_label};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Map (central panel)
// ---------------------------------------------------------------------------

/// Render the display set on a longitude/latitude plot.
///
/// The plot is re-framed to `state.view` whenever the view generation moves
/// past `applied_view`; in between, the user is free to pan and zoom.
pub fn habitat_map(ui: &mut Ui, state: &AppState, applied_view: &mut Option<u64>) {
    let size = ui.available_size();
    let aspect = f64::from(size.x) / f64::from(size.y.max(1.0));
    let reframe = *applied_view != Some(state.view_generation);
    let region = state.view.visible_region(aspect);
    let display = &state.display;

    Plot::new("habitat_map")
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .label_formatter(move |name, value| hover_label(display, name, value))
        .show(ui, |plot_ui| {
            if reframe {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [region.west, region.south],
                    [region.east, region.north],
                ));
            }

            if state.show_events {
                let mut by_month: BTreeMap<Option<u32>, Vec<[f64; 2]>> = BTreeMap::new();
                for e in &display.events {
                    by_month
                        .entry(e.month)
                        .or_default()
                        .push([e.position.lon, e.position.lat]);
                }
                for (month, points) in by_month {
                    let name = match month {
                        Some(m) => format!("Wildfires {}", month_label(m)),
                        None => "Wildfires (month unknown)".to_string(),
                    };
                    plot_ui.points(
                        Points::new(PlotPoints::from(points))
                            .name(name)
                            .color(state.palette.color_for(month))
                            .shape(MarkerShape::Circle)
                            .filled(true)
                            .radius(3.0),
                    );
                }
            }

            if state.show_habitats && !display.locations.is_empty() {
                let points: Vec<[f64; 2]> = display
                    .locations
                    .iter()
                    .map(|l| [l.position.lon, l.position.lat])
                    .collect();
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name("Animal habitats")
                        .color(HABITAT_COLOR)
                        .shape(MarkerShape::Diamond)
                        .filled(true)
                        .radius(7.0),
                );
            }
        });

    *applied_view = Some(state.view_generation);
}

fn hover_label(display: &DisplaySet, series: &str, value: &PlotPoint) -> String {
    let coords = format!("{:.3}°, {:.3}°", value.y, value.x);
    if series.is_empty() {
        return coords;
    }
    let here = GeoPoint {
        lat: value.y,
        lon: value.x,
    };
    match nearest_marker(display, here) {
        Some(label) => format!("{label}\n{coords}"),
        None => coords,
    }
}

/// Describe the marker closest to `here`: a habitat's name, or a wildfire's
/// name and year.
fn nearest_marker(display: &DisplaySet, here: GeoPoint) -> Option<String> {
    let dist = |p: GeoPoint| (p.lat - here.lat).powi(2) + (p.lon - here.lon).powi(2);

    let locations = display
        .locations
        .iter()
        .map(|l| (dist(l.position), l.match_name().to_string()));
    let events = display
        .events
        .iter()
        .map(|e| (dist(e.position), format!("{} ({})", e.display_name(), e.year)));

    locations
        .chain(events)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, label)| label)
}
