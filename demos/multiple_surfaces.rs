//! One camera feeding four surfaces, each with its own fixed filter chain.

use anyhow::Result;
use crossbeam_channel::bounded;
use gpui::Application;
use webcam_filters::{
    chain::FilterChain,
    config::AppConfig,
    filters::{FilterId, FilterRegistry},
    surface::DisplaySurface,
    ui::{self, UiOptions},
};

const LAYOUT: &[(&str, &[FilterId])] = &[
    ("Original", &[]),
    ("Grayscale", &[FilterId::Grayscale]),
    ("Negative", &[FilterId::Negative]),
    ("Grayscale + Negative", &[FilterId::Grayscale, FilterId::Negative]),
];

fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();
    let registry = FilterRegistry::new(&config);

    let surfaces: Vec<DisplaySurface> = LAYOUT
        .iter()
        .map(|(label, ids)| {
            let chain: FilterChain = ids.iter().filter_map(|&id| registry.find(id)).collect();
            DisplaySurface::with_chain(*label, chain)
        })
        .collect();

    let (event_tx, event_rx) = bounded(1);
    let options = UiOptions {
        title: "Multiple Surfaces".into(),
        filter_toggles: false,
    };

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) =
                ui::launch_ui(app, options, config, registry, surfaces, event_rx, event_tx)
            {
                eprintln!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    Ok(())
}
