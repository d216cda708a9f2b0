//! Forecast lookup against the OpenWeatherMap 5-day / 3-hour endpoint,
//! mapped down to what the dashboard shows per time step.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;

use crate::config::WeatherConfig;

// ---------------------------------------------------------------------------
// Display types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Rain,
    Snow,
    Clouds,
    Clear,
}

impl Condition {
    /// Map the provider's `weather[0].main` group. Anything unrecognised
    /// (mist, drizzle, thunderstorm...) shows as clear.
    fn from_group(group: &str) -> Self {
        match group {
            "Rain" => Self::Rain,
            "Snow" => Self::Snow,
            "Clouds" => Self::Clouds,
            _ => Self::Clear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Degrees Celsius, rounded.
    pub temperature: i64,
    /// Percent, rounded.
    pub precipitation_probability: u8,
    pub condition: Condition,
}

// ---------------------------------------------------------------------------
// Provider payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawForecast {
    list: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    dt: i64,
    main: RawMain,
    #[serde(default)]
    pop: Option<f64>,
    #[serde(default)]
    weather: Vec<RawWeather>,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct RawWeather {
    main: String,
}

fn map_entry(raw: RawEntry) -> Result<ForecastEntry> {
    let timestamp = OffsetDateTime::from_unix_timestamp(raw.dt)
        .with_context(|| format!("forecast timestamp {} out of range", raw.dt))?;
    let pop = raw.pop.unwrap_or(0.0).clamp(0.0, 1.0);
    let condition = raw
        .weather
        .first()
        .map(|w| Condition::from_group(&w.main))
        .unwrap_or(Condition::Clear);

    Ok(ForecastEntry {
        timestamp,
        temperature: raw.main.temp.round() as i64,
        precipitation_probability: (pop * 100.0).round() as u8,
        condition,
    })
}

pub(crate) fn parse_forecast(body: &str) -> Result<Vec<ForecastEntry>> {
    let raw: RawForecast = serde_json::from_str(body).context("unexpected forecast payload")?;
    raw.list.into_iter().map(map_entry).collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    api_key: String,
}

impl WeatherClient {
    /// `None` when no API key is configured; the forecast is then disabled.
    pub fn new(cfg: &WeatherConfig, timeout: Duration) -> Result<Option<Self>> {
        let Some(api_key) = cfg.api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Some(Self {
            http,
            base_url: cfg.base_url.clone(),
            latitude: cfg.latitude,
            longitude: cfg.longitude,
            api_key,
        }))
    }

    pub async fn fetch_forecast(&self) -> Result<Vec<ForecastEntry>> {
        debug!(lat = self.latitude, lon = self.longitude, "GET forecast");
        let body = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .context("forecast request failed")?
            .error_for_status()?
            .text()
            .await
            .context("failed to read forecast body")?;
        parse_forecast(&body)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
