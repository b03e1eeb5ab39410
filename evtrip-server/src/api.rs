//! REST API and SSE routes

use crate::state::{AppState, SessionEvent};
use crate::web_ui;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, put},
    Json, Router,
};
use evtrip_core::curve::CurvePoint;
use evtrip_core::engine::{SimulationState, Snapshot};
use evtrip_core::model::{Selection, TripId, VehicleId};
use evtrip_core::session::{Phase, PlaybackSession};
use evtrip_core::units::Kilometers;
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

const MSGPACK: &str = "application/msgpack";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web_ui::serve_ui))
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/:vehicle_id/trips", get(list_trips))
        .route("/api/sessions", get(list_sessions))
        .route(
            "/api/sessions/:slot/selection",
            put(select_trip).delete(clear_selection),
        )
        .route("/api/sessions/:slot/snapshot", get(session_snapshot))
        .route("/api/stream", get(session_stream))
        .route("/api/curve", get(curve_points))
        .route("/api/curve/risk", get(curve_risk))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn session_for(state: &AppState, slot: usize) -> Result<&Arc<RwLock<PlaybackSession>>, ApiError> {
    state.session(slot).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("No playback slot {} ({} configured)", slot, state.sessions.len()),
        )
    })
}

// === Telemetry Listing Endpoints ===

async fn list_vehicles(State(state): State<AppState>) -> Json<Vec<VehicleId>> {
    Json(state.engine.store().vehicles())
}

async fn list_trips(
    State(state): State<AppState>,
    Path(vehicle_id): Path<u32>,
) -> Json<Vec<TripId>> {
    Json(state.engine.store().trips(VehicleId(vehicle_id)))
}

// === Session Endpoints ===

#[derive(Serialize)]
struct SessionInfo {
    slot: usize,
    selection: Option<Selection>,
    phase: Phase,
    state: Option<SimulationState>,
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let mut info = Vec::with_capacity(state.sessions.len());
    for (slot, session) in state.sessions.iter().enumerate() {
        let session = session.read().await;
        info.push(SessionInfo {
            slot,
            selection: session.selection().copied(),
            phase: session.phase(),
            state: session.state().cloned(),
        });
    }
    Json(info)
}

#[derive(Deserialize)]
struct SelectionRequest {
    vehicle_id: u32,
    trip_id: u32,
}

/// Switch a slot to a new trip, restarting playback at the current tick
async fn select_trip(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SessionEvent>, ApiError> {
    let session = session_for(&state, slot)?;
    let selection = Selection::new(request.vehicle_id, request.trip_id);

    let mut session = session.write().await;
    let tick = state.current_tick();
    session.select(&state.engine, tick, selection);

    match session.phase() {
        Phase::Idle => tracing::info!("Slot {}: {} has no samples, idle", slot, selection),
        _ => tracing::info!("Slot {}: playing {} from tick {}", slot, selection, tick),
    }

    state.publish(slot, tick, &session);
    Ok(Json(SessionEvent {
        slot,
        tick,
        phase: session.phase(),
        selection: Some(selection),
        snapshot: session.snapshot().clone(),
    }))
}

async fn clear_selection(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> Result<StatusCode, ApiError> {
    let session = session_for(&state, slot)?;
    let mut session = session.write().await;
    session.clear();
    state.publish(slot, state.current_tick(), &session);

    tracing::info!("Slot {} cleared", slot);
    Ok(StatusCode::NO_CONTENT)
}

/// Last snapshot of a slot, as JSON or MessagePack depending on `Accept`
async fn session_snapshot(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = session_for(&state, slot)?;
    let snapshot: Snapshot = session.read().await.snapshot().clone();

    let wants_msgpack = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains(MSGPACK))
        .unwrap_or(false);

    if wants_msgpack {
        let bytes = rmp_serde::to_vec_named(&snapshot).map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode snapshot: {}", e),
            )
        })?;
        return Ok(([(header::CONTENT_TYPE, MSGPACK)], bytes).into_response());
    }

    Ok(Json(snapshot).into_response())
}

// === Snapshot Stream Endpoint ===

#[derive(Deserialize)]
struct StreamQuery {
    slot: Option<usize>,
}

async fn session_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let slot_filter = query.slot;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) => {
                if slot_filter.is_some_and(|slot| slot != event.slot) {
                    return None;
                }
                match serde_json::to_string(&event) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize event: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Broadcast stream error: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Degradation Curve Endpoints ===

async fn curve_points(State(state): State<AppState>) -> Json<Vec<CurvePoint>> {
    Json(state.engine.config().curve.points().to_vec())
}

#[derive(Deserialize)]
struct RiskQuery {
    distance_km: f64,
}

async fn curve_risk(
    State(state): State<AppState>,
    Query(query): Query<RiskQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !query.distance_km.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            "distance_km must be a finite number".to_string(),
        ));
    }
    let probability = state
        .engine
        .config()
        .curve
        .interpolate(Kilometers(query.distance_km));

    Ok(Json(serde_json::json!({
        "distance_km": query.distance_km,
        "probability": probability,
    })))
}
