use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use voyra_schedule::{
    upcoming_dates, DayOfWeek, NewTripTemplate, RecurrenceKind, TemplateStatus, TripTemplate,
};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/templates", post(create_template).get(list_templates))
        .route(
            "/v1/templates/{id}",
            get(get_template)
                .put(update_template)
                .delete(deactivate_template),
        )
        .route("/v1/templates/{id}/status", patch(set_template_status))
        .route("/v1/templates/{id}/dates", get(list_template_dates))
}

/// Operator input. Seat capacity and slot times are not accepted from the
/// caller; they are denormalized from the referenced vehicle and time slot.
#[derive(Debug, Deserialize)]
struct TemplateRequest {
    pickup_city_id: Uuid,
    dropoff_city_id: Uuid,
    vehicle_id: Uuid,
    time_slot_id: Uuid,
    price_amount: i64,
    currency: String,
    recurrence: RecurrenceKind,
    #[serde(default)]
    weekly_days: BTreeSet<DayOfWeek>,
    start_date: NaiveDate,
}

async fn resolve_template_input(
    state: &AppState,
    req: TemplateRequest,
) -> Result<NewTripTemplate, ApiError> {
    for (label, id) in [
        ("pickup city", req.pickup_city_id),
        ("dropoff city", req.dropoff_city_id),
    ] {
        if state.catalog.get_city(id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("Unknown {}: {}", label, id)));
        }
    }

    let vehicle = state
        .catalog
        .get_vehicle(req.vehicle_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown vehicle: {}", req.vehicle_id)))?;
    if !vehicle.is_active {
        return Err(ApiError::BadRequest(format!(
            "Vehicle {} is out of service",
            vehicle.registration
        )));
    }
    let vehicle_type = state
        .catalog
        .get_vehicle_type(vehicle.vehicle_type_id)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(format!("vehicle type {} missing", vehicle.vehicle_type_id))
        })?;
    let slot = state
        .catalog
        .get_time_slot(req.time_slot_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown time slot: {}", req.time_slot_id)))?;

    Ok(NewTripTemplate {
        pickup_city_id: req.pickup_city_id,
        dropoff_city_id: req.dropoff_city_id,
        vehicle_id: vehicle.id,
        vehicle_type_id: vehicle_type.id,
        seat_capacity: vehicle_type.seat_capacity,
        time_slot_id: slot.id,
        departure_time: slot.departure_time,
        arrival_time: slot.arrival_time,
        price_amount: req.price_amount,
        currency: req.currency,
        recurrence: req.recurrence,
        weekly_days: req.weekly_days,
        start_date: req.start_date,
    })
}

async fn create_template(
    State(state): State<AppState>,
    Json(req): Json<TemplateRequest>,
) -> Result<(StatusCode, Json<TripTemplate>), ApiError> {
    let new = resolve_template_input(&state, req).await?;
    let template = TripTemplate::create(new)?;
    state.templates.create_template(&template).await?;
    info!("Created trip template {}", template.id);
    Ok((StatusCode::CREATED, Json(template)))
}

#[derive(Debug, Deserialize)]
struct ListTemplatesQuery {
    status: Option<TemplateStatus>,
}

async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<TripTemplate>>, ApiError> {
    let templates = state.templates.list_templates(query.status).await?;
    Ok(Json(templates))
}

async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripTemplate>, ApiError> {
    let template = state
        .templates
        .get_template(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("template {}", id)))?;
    Ok(Json(template))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TemplateRequest>,
) -> Result<Json<TripTemplate>, ApiError> {
    let new = resolve_template_input(&state, req).await?;
    let template = state.templates.update_template(id, new).await?;
    Ok(Json(template))
}

/// Templates are soft-deleted: bookings may still reference them.
async fn deactivate_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .templates
        .set_template_status(id, TemplateStatus::Inactive)
        .await?;
    info!("Deactivated trip template {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetTemplateStatusRequest {
    status: TemplateStatus,
}

async fn set_template_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetTemplateStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state.templates.set_template_status(id, req.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TemplateDatesQuery {
    from: Option<NaiveDate>,
    limit: Option<usize>,
}

async fn list_template_dates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TemplateDatesQuery>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    let template = state
        .templates
        .get_template(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("template {}", id)))?;

    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
    let limit = query.limit.unwrap_or(30).min(90);
    Ok(Json(upcoming_dates(&template, from, limit)))
}
