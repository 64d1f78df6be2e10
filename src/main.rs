mod app;
mod color;
mod config;
mod data;
mod debounce;
mod fit;
mod service;
mod state;
mod ui;

use app::HabitatLensApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Habitat Lens – Animal Habitats & Wildfires",
        options,
        Box::new(move |cc| {
            // Install image loaders so egui can render the photo preview.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(HabitatLensApp::new(&config)))
        }),
    )
}
