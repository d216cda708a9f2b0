//! In-process stand-in for the device bridge, bound to an ephemeral port.
//! Records every request and can be switched into failure modes.

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::plant::Plant;

pub(crate) fn sample_plant() -> Plant {
    Plant {
        id: 1,
        name: "Basil".into(),
        soil_moisture: 42.0,
        required_soil_moisture: 60.0,
        last_watered: "2024-11-02T06:30:00.000Z".into(),
        is_watering_scheduled: true,
        watering_time1: "06:30".parse().unwrap(),
        watering_time2: "18:00".parse().unwrap(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: String,
}

struct FakeState {
    plant: serde_json::Value,
    raw_plant: Option<String>,
    moisture_body: String,
    fail_with: Option<StatusCode>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<FakeState>>;

pub(crate) struct FakeBridge {
    pub base_url: String,
    state: Shared,
}

impl FakeBridge {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState {
            plant: serde_json::to_value(sample_plant()).unwrap(),
            raw_plant: None,
            moisture_body: "0.5".into(),
            fail_with: None,
            requests: Vec::new(),
        }));

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn fail_with(&self, status: StatusCode) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().fail_with = None;
    }

    pub fn serve_raw_plant(&self, body: &str) {
        self.state.lock().unwrap().raw_plant = Some(body.to_string());
    }

    pub fn set_moisture_body(&self, body: &str) {
        self.state.lock().unwrap().moisture_body = body.to_string();
    }

    /// The bridge-side copy of the plant, with patches applied.
    pub fn stored_plant(&self) -> serde_json::Value {
        self.state.lock().unwrap().plant.clone()
    }
}

async fn handle(State(state): State<Shared>, method: Method, uri: Uri, body: String) -> Response {
    let mut st = state.lock().unwrap();
    let path = uri.path().to_string();
    st.requests.push(Recorded {
        method: method.clone(),
        path: path.clone(),
        body: body.clone(),
    });

    if let Some(status) = st.fail_with {
        return (status, "bridge unavailable").into_response();
    }

    if path.starts_with("/plants/") {
        match method {
            Method::GET => {
                let body = st.raw_plant.clone().unwrap_or_else(|| st.plant.to_string());
                ([(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            Method::PUT => match serde_json::from_str(&body) {
                Ok(v) => {
                    st.plant = v;
                    StatusCode::OK.into_response()
                }
                Err(_) => StatusCode::BAD_REQUEST.into_response(),
            },
            Method::PATCH => match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(serde_json::Value::Object(fields)) => {
                    if let Some(obj) = st.plant.as_object_mut() {
                        obj.extend(fields);
                    }
                    StatusCode::OK.into_response()
                }
                _ => StatusCode::BAD_REQUEST.into_response(),
            },
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        }
    } else if path.ends_with("/soilMoisture") && method == Method::GET {
        st.moisture_body.clone().into_response()
    } else if path.ends_with("/setLighting") && method == Method::POST {
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
