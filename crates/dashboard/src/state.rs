use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::plant::Plant;
use crate::schedule::{self, NextWatering};

/// Maximum number of notifications retained in the ring buffer.
const MAX_NOTIFICATIONS: usize = 100;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedState = Arc<RwLock<DashboardState>>;

pub fn shared() -> SharedState {
    Arc::new(RwLock::new(DashboardState::new()))
}

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Everything one dashboard session knows. Rebuilt from the bridge on every
/// process start.
pub struct DashboardState {
    pub plant: Option<Plant>,
    pub light_on: bool,
    pub notifications: VecDeque<Notification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub level: Level,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

// ---------------------------------------------------------------------------
// JSON response (what the API returns)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub plant: Option<Plant>,
    pub light_on: bool,
    pub next_watering: Option<NextWatering>,
    pub notifications: Vec<Notification>,
}

// ---------------------------------------------------------------------------
// Construction & mutation
// ---------------------------------------------------------------------------

impl DashboardState {
    pub fn new() -> Self {
        Self {
            plant: None,
            light_on: false,
            notifications: VecDeque::with_capacity(MAX_NOTIFICATIONS),
        }
    }

    pub fn notify_success(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        info!(%detail, "operation succeeded");
        self.push(Level::Success, "Success", detail);
    }

    pub fn notify_error(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(%detail, "operation failed");
        self.push(Level::Error, "Error", detail);
    }

    pub fn notify_info(&mut self, title: &str, detail: impl Into<String>) {
        let detail = detail.into();
        info!(title, %detail, "notice");
        self.push(Level::Info, title, detail);
    }

    /// Build the JSON-serialisable status snapshot. The next watering is
    /// derived from `now` on every call.
    pub fn to_status(&self, now: OffsetDateTime) -> StatusResponse {
        StatusResponse {
            plant: self.plant.clone(),
            light_on: self.light_on,
            next_watering: self.plant.as_ref().map(|p| schedule::describe(p, now)),
            notifications: self.notifications.iter().rev().cloned().collect(),
        }
    }

    fn push(&mut self, level: Level, title: &str, detail: String) {
        if self.notifications.len() >= MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.notifications.push_back(Notification {
            ts: OffsetDateTime::now_utc(),
            level,
            title: title.to_string(),
            detail,
        });
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
