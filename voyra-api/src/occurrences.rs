use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use voyra_booking::{OccurrenceFilter, OccurrenceSummary, TripOccurrence};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/occurrences",
            get(list_occurrences).post(materialize_occurrence),
        )
        .route("/v1/occurrences/{id}/seats", get(available_seats))
}

async fn list_occurrences(
    State(state): State<AppState>,
    Query(filter): Query<OccurrenceFilter>,
) -> Result<Json<Vec<OccurrenceSummary>>, ApiError> {
    let occurrences = state.schedule.list_upcoming(filter).await?;
    Ok(Json(occurrences))
}

#[derive(Debug, Deserialize)]
struct MaterializeRequest {
    template_id: Uuid,
    travel_date: NaiveDate,
}

/// Find or lazily create the bookable occurrence for a template and date.
async fn materialize_occurrence(
    State(state): State<AppState>,
    Json(req): Json<MaterializeRequest>,
) -> Result<Json<TripOccurrence>, ApiError> {
    let occurrence = state
        .schedule
        .get_or_create_occurrence(req.template_id, req.travel_date)
        .await?;
    Ok(Json(occurrence))
}

#[derive(Debug, Serialize)]
struct AvailableSeatsResponse {
    occurrence_id: Uuid,
    seats: BTreeSet<u32>,
}

async fn available_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailableSeatsResponse>, ApiError> {
    let seats = state.schedule.available_seats(id).await?;
    Ok(Json(AvailableSeatsResponse {
        occurrence_id: id,
        seats,
    }))
}
