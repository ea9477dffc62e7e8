use deskboard::dashboard::{Dashboard, WidgetContext, WidgetRegistry};
use deskboard::gui::DashboardApp;
use deskboard::settings::Settings;
use deskboard::sources::{http::sources_from_settings, Sources};

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load("settings.json")?;
    deskboard::logging::init(settings.debug_logging, settings.log_path());

    let sources = sources_from_settings(&settings).unwrap_or_else(|err| {
        tracing::error!("failed to set up data providers, running offline: {err:#}");
        Sources::offline()
    });
    let store = settings.state_store();
    tracing::info!(dir = %store.dir().display(), "using dashboard state directory");

    let dashboard = Dashboard::open(
        Box::new(store),
        WidgetRegistry::with_defaults(),
        WidgetContext::from_settings(&settings, sources),
    );
    for warning in &dashboard.warnings {
        tracing::warn!("{warning}");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 640.0])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Deskboard",
        native_options,
        Box::new(move |_cc| Box::new(DashboardApp::new(dashboard))),
    )
    .map_err(|err| anyhow::anyhow!("failed to start the window: {err}"))
}
