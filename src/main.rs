mod api;
mod config;
mod models;
mod records;
mod session;
mod ui;

use anyhow::Result;
use eframe::egui;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let config = config::Config::load()?;
    init_tracing(&config.log_level);

    let runtime = tokio::runtime::Runtime::new()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1080.0, 650.0])
            .with_title("MAC Address Registration"),
        ..Default::default()
    };

    eframe::run_native(
        "MAC Address Registration",
        options,
        Box::new(move |cc| {
            // Force light mode
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Box::new(ui::MacRegApp::new(cc, &config, runtime))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))
}
