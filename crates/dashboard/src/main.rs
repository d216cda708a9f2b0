mod bridge;
mod config;
mod debounce;
mod plant;
mod schedule;
mod state;
mod store;
mod weather;
mod web;

#[cfg(test)]
mod testutil;

use anyhow::Result;
use std::{env, sync::Arc, time::Duration};
use time::UtcOffset;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bridge::BridgeClient;
use store::PlantStore;
use weather::WeatherClient;
use web::AppState;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // The host offset can only be read reliably before worker threads exist.
    let host_offset = UtcOffset::current_local_offset().ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(host_offset))
}

async fn run(host_offset: Option<UtcOffset>) -> Result<()> {
    // ── Config ──────────────────────────────────────────────────────
    let (config_path, required) = match env::var("CONFIG_PATH") {
        Ok(p) => (p, true),
        Err(_) => ("config.toml".to_string(), false),
    };
    let cfg = config::load_or_default(&config_path, required)?;

    let port: u16 = env::var("WEB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(cfg.web.port);

    let utc_offset = match cfg.web.parsed_offset()? {
        Some(o) => o,
        None => host_offset.unwrap_or_else(|| {
            warn!("could not determine local UTC offset, watering times are read as UTC");
            UtcOffset::UTC
        }),
    };

    // ── Store ───────────────────────────────────────────────────────
    let bridge = BridgeClient::new(&cfg.bridge)?;
    info!(
        bridge = %cfg.bridge.base_url,
        plant_id = bridge.plant_id(),
        %utc_offset,
        "dashboard starting"
    );

    let shared = state::shared();
    shared
        .write()
        .await
        .notify_info("Loading Plant Data", "Fetching data from the device bridge...");

    let store = PlantStore::new(bridge, shared);
    store.refresh().await;

    // Off unless configured.
    if let Some(secs) = cfg.bridge.moisture_poll_secs {
        tokio::spawn(store.clone().poll_soil_moisture(Duration::from_secs(secs)));
    }

    // ── Weather ─────────────────────────────────────────────────────
    let weather = WeatherClient::new(&cfg.weather, Duration::from_secs(cfg.bridge.timeout_secs))?;
    if weather.is_none() {
        warn!("no weather api_key configured, forecast disabled");
    }

    // ── Web server ──────────────────────────────────────────────────
    let moisture = Arc::new(
        store.moisture_debouncer(Duration::from_millis(cfg.store.moisture_debounce_ms)),
    );
    let app = AppState {
        store,
        moisture: Arc::clone(&moisture),
        weather,
        utc_offset,
    };

    web::serve(app, port).await?;

    // Send a threshold still waiting out its window.
    if let Ok(moisture) = Arc::try_unwrap(moisture) {
        moisture.close().await;
    }
    Ok(())
}
