use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::database::{BookingStore, CreateBooking};
use crate::feed::aggregate::{FeedError, TransportFeed};
use crate::feed::client::HttpFeedSource;
use crate::spaces;

pub type LiveFeed = TransportFeed<HttpFeedSource>;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingStore>,
    pub feed: Arc<LiveFeed>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub status: String,
    pub message: String,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn transport_live(State(state): State<AppState>) -> Response {
    match state.feed.live_payload(false).await {
        Ok(payload) => (
            [(header::CACHE_CONTROL, "no-store")],
            Json(&*payload),
        )
            .into_response(),
        Err(err @ FeedError::Unavailable) => {
            tracing::error!("Transport live feed unavailable");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn get_parking_space(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match spaces::get_parking_space_by_id(&state.feed, &id).await {
        Ok(Some(space)) => Json(space).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("Parking space {} not found.", id.trim()),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Unable to resolve parking space {}: {}", id, err);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn submit_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBooking>,
) -> Response {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(BookingResponse {
                status: "error".to_string(),
                message: format!("Missing required fields: {}", missing.join(", ")),
            }),
        )
            .into_response();
    }

    match state.bookings.create_booking(request).await {
        Ok(record) => {
            tracing::info!("Booking request stored for space {}", record.space_id);
            Json(BookingResponse {
                status: "ok".to_string(),
                message: "Request received. Hosts typically reply within 15 minutes.".to_string(),
            })
            .into_response()
        }
        Err(err) => {
            tracing::error!("Failed to store booking request: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BookingResponse {
                    status: "error".to_string(),
                    message: "Unable to record booking request.".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/transport/live", get(transport_live))
        .route("/api/parking-spaces/:id", get(get_parking_space))
        .route("/api/bookings", post(submit_booking))
        .with_state(state)
}
