use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::admin::AdminState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub backends: usize,
    pub available_backends: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub address: String,
    /// `unknown`, `unavailable` or `available`.
    pub state: String,
    pub sample_ns: Option<i64>,
    pub last_updated_ms_ago: Option<u64>,
    pub selected: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.coordinator.registry().snapshot();
    let available = snapshot
        .entries()
        .iter()
        .filter(|e| e.latency.is_available())
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if available > 0 { "operational" } else { "degraded" }.to_string(),
        backends: snapshot.len(),
        available_backends: available,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let snapshot = state.coordinator.registry().snapshot();
    let selected = state.coordinator.select(&snapshot).map(|b| b.address);
    let now = Instant::now();

    let statuses = snapshot
        .entries()
        .iter()
        .map(|entry| BackendStatus {
            address: entry.address.clone(),
            state: entry.latency.label().to_string(),
            sample_ns: entry.latency.nanos(),
            last_updated_ms_ago: entry
                .updated_at
                .map(|at| now.saturating_duration_since(at).as_millis() as u64),
            selected: selected.as_deref() == Some(entry.address.as_str()),
        })
        .collect();

    Json(statuses)
}
