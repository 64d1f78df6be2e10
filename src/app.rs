use std::time::Instant;

use eframe::egui;

use crate::config::AppConfig;
use crate::service::DataSource;
use crate::state::{AppState, Services};
use crate::ui::{map, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct HabitatLensApp {
    pub state: AppState,
    /// View generation the map was last framed to.
    applied_view: Option<u64>,
}

impl HabitatLensApp {
    /// Build the state container and start both dataset loads.
    pub fn new(config: &AppConfig) -> Self {
        let mut state = AppState::new(config);
        match Services::from_config(config) {
            Ok(services) => {
                state = state.with_services(services);
                state.start_dataset_loads(
                    DataSource::parse(&config.locations_source()),
                    DataSource::parse(&config.events_source),
                );
            }
            Err(e) => {
                log::error!("Network services unavailable: {e:#}");
                state.error_message = Some(format!("Network services unavailable: {e:#}"));
            }
        }
        Self {
            state,
            applied_view: None,
        }
    }
}

impl eframe::App for HabitatLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Settle jobs and debounced filters before anything is drawn.
        self.state.tick(Instant::now());

        // ---- Top panel: status bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state);
        });

        // ---- Left side panel: upload + filters ----
        egui::SidePanel::left("control_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::habitat_map(ui, &self.state, &mut self.applied_view);
        });

        // Filter edits made this frame armed new timers; wake up for them.
        if let Some(wait) = self.state.next_wake(Instant::now()) {
            ctx.request_repaint_after(wait);
        }
    }
}
