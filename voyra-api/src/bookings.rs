use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use voyra_booking::{BookSeatsRequest, Booking, BookingStatus, PaymentStatus};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(book_seats))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/status", patch(set_booking_status))
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    id: Uuid,
    occurrence_id: Uuid,
    travel_date: NaiveDate,
    seat_number: u32,
    reservation_code: String,
    amount: i64,
    currency: String,
    status: BookingStatus,
    payment_status: PaymentStatus,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            occurrence_id: booking.occurrence_id,
            travel_date: booking.travel_date,
            seat_number: booking.seat_number,
            reservation_code: booking.reservation_code.clone(),
            amount: booking.amount,
            currency: booking.currency.clone(),
            status: booking.status,
            payment_status: booking.payment_status,
        }
    }
}

/// The only seat-mutating entry point: self-service and admin bookings both
/// land here so the inventory invariants hold uniformly.
async fn book_seats(
    State(state): State<AppState>,
    Json(req): Json<BookSeatsRequest>,
) -> Result<(StatusCode, Json<Vec<BookingResponse>>), ApiError> {
    let bookings = state.schedule.book_seats(req).await?;
    info!(
        "Booked {} seat(s), codes: {}",
        bookings.len(),
        bookings
            .iter()
            .map(|b| b.reservation_code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let response = bookings.iter().map(BookingResponse::from).collect();
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .schedule
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("booking {}", id)))?;
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct SetBookingStatusRequest {
    status: BookingStatus,
}

async fn set_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetBookingStatusRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.schedule.set_booking_status(id, req.status).await?;
    info!("Booking {} moved to {}", id, booking.status.as_str());
    Ok(Json(BookingResponse::from(&booking)))
}
