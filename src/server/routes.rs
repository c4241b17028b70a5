//! HTTP routes for the timer contract

use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::paths::routes;
use crate::core::{Ack, WakePayload};
use crate::service::{AdzanService, ServiceStatus};

#[derive(Clone)]
pub struct AppState { pub service: Arc<AdzanService>, pub app_name: String }

impl AppState {
    pub fn new(service: Arc<AdzanService>, app_name: impl Into<String>) -> Self {
        Self { service, app_name: app_name.into() }
    }
}

/// Body of `startTimer`. Field names follow the UI's method channel.
#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    #[serde(rename = "targetTime")]
    pub target_time: i64,
    #[serde(rename = "prayerName", default)]
    pub prayer_name: Option<String>,
}

/// Wake delivered by an external alarm host.
#[derive(Debug, Deserialize)]
pub struct FireRequest {
    #[serde(rename = "prayerName", default)]
    pub prayer_name: Option<String>,
    #[serde(rename = "targetTime", default)]
    pub target_time: i64,
}

#[derive(Debug, Serialize)]
pub struct AckResponse { ack: Ack, message: &'static str }

impl From<Ack> for AckResponse {
    fn from(ack: Ack) -> Self { Self { ack, message: ack.as_str() } }
}

#[derive(Debug, Serialize)]
pub struct FireResponse { dispatched: bool, label: Option<String>, reason: Option<String> }

pub fn create_router(service: Arc<AdzanService>) -> Router { create_router_with_name(service, "adzan") }

pub fn create_router_with_name(service: Arc<AdzanService>, app_name: &str) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::TIMER_STATUS, get(timer_status))
        .route(routes::TIMER_START, post(start_timer))
        .route(routes::TIMER_STOP, post(stop_timer))
        .route(routes::ALARM_FIRE, post(fire_alarm))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(service, app_name))
}

async fn health(State(s): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": s.app_name}))
}

async fn timer_status(State(s): State<AppState>) -> Json<ServiceStatus> {
    Json(s.service.status())
}

async fn start_timer(State(s): State<AppState>, Json(req): Json<StartTimerRequest>) -> Json<AckResponse> {
    let label = req.prayer_name.unwrap_or_default();
    Json(s.service.start_timer(req.target_time, &label).into())
}

async fn stop_timer(State(s): State<AppState>) -> Json<AckResponse> {
    Json(s.service.stop_timer().into())
}

async fn fire_alarm(State(s): State<AppState>, Json(req): Json<FireRequest>) -> Json<FireResponse> {
    let payload = WakePayload { label: req.prayer_name, target_ms: req.target_time };
    match s.service.on_wake(payload) {
        Ok(label) => Json(FireResponse { dispatched: true, label: Some(label), reason: None }),
        Err(e) => Json(FireResponse { dispatched: false, label: None, reason: Some(e.to_string()) }),
    }
}
