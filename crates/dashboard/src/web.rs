use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use time::{OffsetDateTime, UtcOffset};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::debounce::Debouncer;
use crate::plant::{Plant, WateringTimesPatch};
use crate::store::{Outcome, PlantStore};
use crate::weather::WeatherClient;

#[derive(Clone)]
pub struct AppState {
    pub store: PlantStore,
    pub moisture: Arc<Debouncer<f64>>,
    pub weather: Option<WeatherClient>,
    /// Offset the watering slots are interpreted in.
    pub utc_offset: UtcOffset,
}

#[derive(Debug, Deserialize)]
struct IdealMoistureBody {
    value: f64,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/plant", put(replace_plant))
        .route("/api/plant/refresh", post(refresh_plant))
        .route("/api/plant/watering-times", put(set_watering_times))
        .route("/api/plant/ideal-moisture", put(set_ideal_moisture))
        .route("/api/plant/soil-moisture/read", post(read_soil_moisture))
        .route("/api/light/toggle", post(toggle_light))
        .route("/api/weather", get(weather))
        .with_state(state)
}

async fn api_status(State(app): State<AppState>) -> impl IntoResponse {
    let st = app.store.state().read().await;
    Json(st.to_status(app.now()))
}

async fn refresh_plant(State(app): State<AppState>) -> Response {
    let outcome = app.store.refresh().await;
    respond(&app, outcome).await
}

async fn replace_plant(
    State(app): State<AppState>,
    body: Result<Json<Plant>, JsonRejection>,
) -> Response {
    let Json(plant) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };
    let outcome = app.store.replace(plant).await;
    respond(&app, outcome).await
}

async fn set_watering_times(
    State(app): State<AppState>,
    body: Result<Json<WateringTimesPatch>, JsonRejection>,
) -> Response {
    let Json(patch) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };
    let outcome = app
        .store
        .set_watering_times(patch.watering_time1, patch.watering_time2)
        .await;
    respond(&app, outcome).await
}

/// Queue the threshold; the debouncer sends it once input settles.
async fn set_ideal_moisture(
    State(app): State<AppState>,
    body: Result<Json<IdealMoistureBody>, JsonRejection>,
) -> Response {
    let Json(IdealMoistureBody { value }) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };
    if !(0.0..=100.0).contains(&value) {
        return bad_request(format!("ideal moisture {value} out of range [0, 100]"));
    }
    if !app.moisture.push(value) {
        warn!("moisture debouncer is gone");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "moisture updates unavailable" })),
        )
            .into_response();
    }
    (StatusCode::ACCEPTED, Json(json!({ "queued": value }))).into_response()
}

async fn read_soil_moisture(State(app): State<AppState>) -> Response {
    let outcome = app.store.read_soil_moisture_sensor().await;
    respond(&app, outcome).await
}

async fn toggle_light(State(app): State<AppState>) -> Response {
    let outcome = app.store.toggle_light().await;
    respond(&app, outcome).await
}

async fn weather(State(app): State<AppState>) -> Response {
    let Some(client) = app.weather.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "weather forecast disabled: no api_key configured" })),
        )
            .into_response();
    };
    match client.fetch_forecast().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            warn!("forecast fetch failed: {e:#}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Failed to fetch weather data: {e:#}") })),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Status snapshot after a store operation. The notification already holds
/// the failure reason, so a failed outcome only changes the status code.
async fn respond(app: &AppState, outcome: Outcome) -> Response {
    let code = match outcome {
        Outcome::Applied => StatusCode::OK,
        Outcome::Failed => StatusCode::BAD_GATEWAY,
        Outcome::Rejected => StatusCode::BAD_REQUEST,
    };
    let st = app.store.state().read().await;
    (code, Json(st.to_status(app.now()))).into_response()
}

fn bad_request(msg: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": msg.into() })),
    )
        .into_response()
}

impl AppState {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind web port {port}"))?;

    info!(%addr, "dashboard api listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await
        .context("web server error")
}

// ===========================================================================
// Tests
// ===========================================================================
