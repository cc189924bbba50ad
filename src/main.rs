#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use crossbeam_channel::bounded;
use gpui::Application;
use webcam_filters::{
    config::AppConfig,
    filters::FilterRegistry,
    model_download,
    surface::DisplaySurface,
    ui::{self, UiOptions},
};

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();
    if let Err(err) = model_download::ensure_face_model_available(&config.face_model_path) {
        log::warn!("face detection disabled: {err:#}");
    }
    let registry = FilterRegistry::new(&config);

    let (event_tx, event_rx) = bounded(1);
    let surfaces = vec![DisplaySurface::new("Camera")];

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(
                app,
                UiOptions::default(),
                config,
                registry,
                surfaces,
                event_rx,
                event_tx,
            ) {
                eprintln!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    Ok(())
}
