//! TOML config file loading and validation for the bridge, weather, web and
//! store settings.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use time::macros::format_description;
use time::UtcOffset;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub weather: WeatherConfig,
    pub web: WebConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
    pub plant_id: i64,
    pub account: u32,
    pub device: u32,
    pub timeout_secs: u64,
    /// Live moisture poll interval. Unset keeps polling off.
    pub moisture_poll_secs: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            plant_id: 1,
            account: 1,
            device: 1,
            timeout_secs: 10,
            moisture_poll_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/forecast".to_string(),
            latitude: 59.33,
            longitude: 18.06,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
    /// `+HH:MM` offset the watering slots are read in. Unset uses the
    /// host's offset detected at startup.
    pub utc_offset: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            utc_offset: None,
        }
    }
}

impl WebConfig {
    pub fn parsed_offset(&self) -> Result<Option<UtcOffset>> {
        self.utc_offset
            .as_deref()
            .map(|s| {
                UtcOffset::parse(
                    s,
                    format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
                )
                .with_context(|| format!("utc_offset '{s}' is not of the form +HH:MM"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub moisture_debounce_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            moisture_debounce_ms: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all sections. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_bridge(&mut errors);
        self.validate_weather(&mut errors);

        if self.web.port == 0 {
            errors.push("web: port must be nonzero".to_string());
        }
        if let Err(e) = self.web.parsed_offset() {
            errors.push(format!("web: {e}"));
        }
        if self.store.moisture_debounce_ms == 0 {
            errors.push("store: moisture_debounce_ms must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_bridge(&self, errors: &mut Vec<String>) {
        let b = &self.bridge;

        if !is_http_url(&b.base_url) {
            errors.push(format!(
                "bridge: base_url '{}' must start with http:// or https://",
                b.base_url
            ));
        }
        if b.timeout_secs == 0 {
            errors.push("bridge: timeout_secs must be positive".to_string());
        }
        if b.moisture_poll_secs == Some(0) {
            errors.push("bridge: moisture_poll_secs must be positive when set".to_string());
        }
    }

    fn validate_weather(&self, errors: &mut Vec<String>) {
        let w = &self.weather;

        if !is_http_url(&w.base_url) {
            errors.push(format!(
                "weather: base_url '{}' must start with http:// or https://",
                w.base_url
            ));
        }
        if !(-90.0..=90.0).contains(&w.latitude) {
            errors.push(format!(
                "weather: latitude {} out of range [-90, 90]",
                w.latitude
            ));
        }
        if !(-180.0..=180.0).contains(&w.longitude) {
            errors.push(format!(
                "weather: longitude {} out of range [-180, 180]",
                w.longitude
            ));
        }
        if matches!(&w.api_key, Some(k) if k.trim().is_empty()) {
            errors.push("weather: api_key is empty (omit it to disable the forecast)".to_string());
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.
pub fn load(path: &str) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

/// Like [`load`], but a missing file yields the built-in defaults when
/// `required` is false.
pub fn load_or_default(path: &str, required: bool) -> Result<Config> {
    if !required && !Path::new(path).exists() {
        tracing::info!(path, "no config file, using defaults");
        return Ok(Config::default());
    }
    load(path)
}

// ===========================================================================
// Tests
// ===========================================================================
