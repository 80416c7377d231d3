mod app;
mod config;
mod domain;
mod focus;
mod github;
mod preferences;
mod refresh;
mod session;
mod storage;
mod views;

#[cfg(test)]
mod testutil;

use app::{APP_NAME, WorkdayApp};
use config::DashboardConfig;
use eframe::NativeOptions;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::load().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable configuration; using defaults");
        DashboardConfig::default()
    });

    let options = NativeOptions::default();
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(|cc| Ok(Box::new(WorkdayApp::new(cc, config)?))),
    )
}
