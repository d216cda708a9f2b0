//! Plant State Store: the session's single source of truth for the plant
//! record and light flag.
//!
//! Every operation makes at most one bridge call and ends in an [`Outcome`].
//! Failures never escape as errors: they are recorded as one error
//! notification and local state keeps its pre-call values. Successful writes
//! merge only after the bridge acknowledges them, so there is nothing to roll
//! back.
//!
//! Operations are not serialized against each other. Two calls touching the
//! same field race, and whichever response lands last wins.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::bridge::BridgeClient;
use crate::debounce::Debouncer;
use crate::plant::{IdealMoisturePatch, Plant, WateringTime, WateringTimesPatch};
use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Applied,
    /// The bridge call failed.
    Failed,
    /// Refused before any bridge call.
    Rejected,
}

const NOT_LOADED: &str = "plant record not loaded";

#[derive(Clone)]
pub struct PlantStore {
    bridge: BridgeClient,
    state: SharedState,
}

impl PlantStore {
    pub fn new(bridge: BridgeClient, state: SharedState) -> Self {
        Self { bridge, state }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Replace the local record with the bridge's copy.
    pub async fn refresh(&self) -> Outcome {
        match self.bridge.fetch_plant().await {
            Ok(plant) => {
                info!(
                    plant_id = plant.id,
                    soil_moisture = plant.soil_moisture,
                    scheduled = plant.is_watering_scheduled,
                    "plant refreshed"
                );
                self.state.write().await.plant = Some(plant);
                Outcome::Applied
            }
            Err(e) => self.fail("Failed to fetch plant data", e).await,
        }
    }

    /// Write the full record, then adopt it locally.
    ///
    /// The id, `lastWatered` and `isWateringScheduled` belong to the bridge:
    /// a record for another id is refused, and the other two are carried
    /// over from the loaded record whatever the caller sent.
    pub async fn replace(&self, mut plant: Plant) -> Outcome {
        const WHAT: &str = "Failed to save plant";
        let current = self.state.read().await.plant.clone();
        let Some(current) = current else {
            return self.reject(WHAT, NOT_LOADED).await;
        };
        if plant.id != current.id {
            let reason = format!("plant id {} does not match loaded plant {}", plant.id, current.id);
            return self.reject(WHAT, &reason).await;
        }
        plant.last_watered = current.last_watered;
        plant.is_watering_scheduled = current.is_watering_scheduled;

        if let Err(e) = self.bridge.replace_plant(&plant).await {
            return self.fail(WHAT, e).await;
        }
        let mut st = self.state.write().await;
        st.plant = Some(plant);
        st.notify_success("Plant updated");
        Outcome::Applied
    }

    pub async fn set_watering_times(&self, first: WateringTime, second: WateringTime) -> Outcome {
        const WHAT: &str = "Failed to save watering times";
        if !self.has_plant().await {
            return self.reject(WHAT, NOT_LOADED).await;
        }

        let patch = WateringTimesPatch {
            watering_time1: first,
            watering_time2: second,
        };
        if let Err(e) = self.bridge.patch_watering_times(&patch).await {
            return self.fail(WHAT, e).await;
        }

        // Both slots change under one write lock.
        let mut st = self.state.write().await;
        if let Some(p) = st.plant.as_mut() {
            p.watering_time1 = first;
            p.watering_time2 = second;
        }
        st.notify_success("Watering times updated");
        info!(%first, %second, "watering times saved");
        Outcome::Applied
    }

    /// Send a new moisture threshold. Interactive callers should go through
    /// [`PlantStore::moisture_debouncer`] rather than call this per input.
    pub async fn set_ideal_moisture(&self, value: f64) -> Outcome {
        const WHAT: &str = "Failed to save soil moisture setting";
        if !self.has_plant().await {
            return self.reject(WHAT, NOT_LOADED).await;
        }

        let patch = IdealMoisturePatch {
            required_soil_moisture: value,
        };
        if let Err(e) = self.bridge.patch_ideal_moisture(&patch).await {
            return self.fail(WHAT, e).await;
        }

        let mut st = self.state.write().await;
        if let Some(p) = st.plant.as_mut() {
            p.required_soil_moisture = value;
        }
        st.notify_success("Soil moisture setting updated");
        info!(value, "ideal soil moisture saved");
        Outcome::Applied
    }

    /// Read the live sensor (a 0..1 fraction) and store it as a percentage.
    pub async fn read_soil_moisture_sensor(&self) -> Outcome {
        const WHAT: &str = "Failed to read soil moisture";
        if !self.has_plant().await {
            return self.reject(WHAT, NOT_LOADED).await;
        }

        match self.bridge.read_soil_moisture().await {
            Ok(fraction) => {
                let percent = fraction * 100.0;
                if let Some(p) = self.state.write().await.plant.as_mut() {
                    p.soil_moisture = percent;
                }
                debug!(percent, "soil moisture read");
                Outcome::Applied
            }
            Err(e) => self.fail(WHAT, e).await,
        }
    }

    /// Ask the bridge for the opposite of the current light state; the local
    /// flag flips only once the bridge accepts.
    pub async fn toggle_light(&self) -> Outcome {
        let desired = !self.state.read().await.light_on;

        if let Err(e) = self.bridge.set_lighting(desired.into()).await {
            return self.fail("Failed to switch the light", e).await;
        }
        self.state.write().await.light_on = desired;
        info!(on = desired, "light switched");
        Outcome::Applied
    }

    /// Coalesce ideal-moisture input so only the last value of a burst is
    /// sent.
    pub fn moisture_debouncer(&self, window: Duration) -> Debouncer<f64> {
        let store = self.clone();
        Debouncer::spawn(window, move |value| {
            let store = store.clone();
            async move {
                store.set_ideal_moisture(value).await;
            }
        })
    }

    /// Refresh the live moisture reading forever. Intended to be
    /// `tokio::spawn`-ed from main.
    pub async fn poll_soil_moisture(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        info!(every_sec = every.as_secs(), "soil moisture polling started");
        loop {
            ticker.tick().await;
            self.read_soil_moisture_sensor().await;
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn has_plant(&self) -> bool {
        self.state.read().await.plant.is_some()
    }

    async fn fail(&self, what: &str, err: anyhow::Error) -> Outcome {
        self.state
            .write()
            .await
            .notify_error(format!("{what}: {err:#}"));
        Outcome::Failed
    }

    async fn reject(&self, what: &str, reason: &str) -> Outcome {
        self.state
            .write()
            .await
            .notify_error(format!("{what}: {reason}"));
        Outcome::Rejected
    }
}

// ===========================================================================
// Tests
// ===========================================================================
