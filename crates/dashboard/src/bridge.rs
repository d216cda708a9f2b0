//! HTTP client for the device bridge: plant persistence under `/plants` and
//! hardware access under `/mqtt/<account>/<device>`.
//!
//! Every call maps transport failures, non-2xx statuses and malformed
//! payloads to an `anyhow::Error`. Callers decide how to surface them.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::config::BridgeConfig;
use crate::plant::{IdealMoisturePatch, LightCommand, LightState, Plant, WateringTimesPatch};

#[derive(Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    plant_id: i64,
    account: u32,
    device: u32,
}

impl BridgeClient {
    pub fn new(cfg: &BridgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            plant_id: cfg.plant_id,
            account: cfg.account,
            device: cfg.device,
        })
    }

    pub fn plant_id(&self) -> i64 {
        self.plant_id
    }

    fn plant_url(&self) -> String {
        format!("{}/plants/{}", self.base_url, self.plant_id)
    }

    fn device_url(&self, action: &str) -> String {
        format!(
            "{}/mqtt/{}/{}/{action}",
            self.base_url, self.account, self.device
        )
    }

    // ----------------------------
    // Plant record
    // ----------------------------

    pub async fn fetch_plant(&self) -> Result<Plant> {
        let url = self.plant_url();
        debug!(%url, "GET plant");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;
        resp.json::<Plant>()
            .await
            .context("unexpected plant payload")
    }

    pub async fn replace_plant(&self, plant: &Plant) -> Result<()> {
        let url = self.plant_url();
        debug!(%url, "PUT plant");
        self.http
            .put(&url)
            .json(plant)
            .send()
            .await
            .with_context(|| format!("PUT {url}"))?
            .error_for_status()?;
        Ok(())
    }

    pub async fn patch_watering_times(&self, patch: &WateringTimesPatch) -> Result<()> {
        self.patch(patch).await
    }

    pub async fn patch_ideal_moisture(&self, patch: &IdealMoisturePatch) -> Result<()> {
        self.patch(patch).await
    }

    async fn patch<T: serde::Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let url = self.plant_url();
        debug!(%url, "PATCH plant");
        self.http
            .patch(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("PATCH {url}"))?
            .error_for_status()?;
        Ok(())
    }

    // ----------------------------
    // Hardware
    // ----------------------------

    /// Live sensor value as a 0.0..=1.0 fraction. The bridge answers with a
    /// bare number in plain text.
    pub async fn read_soil_moisture(&self) -> Result<f64> {
        let url = self.device_url("soilMoisture");
        debug!(%url, "GET soil moisture");
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?
            .text()
            .await
            .context("failed to read soil moisture body")?;
        parse_fraction(&body)
    }

    pub async fn set_lighting(&self, state: LightState) -> Result<()> {
        let url = self.device_url("setLighting");
        debug!(%url, ?state, "POST lighting");
        self.http
            .post(&url)
            .json(&LightCommand { state })
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()?;
        Ok(())
    }
}

/// Parse the bridge's plain-text moisture scalar.
pub(crate) fn parse_fraction(body: &str) -> Result<f64> {
    let s = body.trim();
    let v: f64 = s
        .parse()
        .with_context(|| format!("soil moisture '{s}' is not a number"))?;
    if !(0.0..=1.0).contains(&v) {
        bail!("soil moisture {v} out of range [0, 1]");
    }
    Ok(v)
}

// ===========================================================================
// Tests
// ===========================================================================
