use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use voyra_shared::Masked;

/// Booking lifecycle status. `Cancelled` is terminal by convention; a new
/// booking must be made instead of reactivating one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Boarded,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Boarded => "BOARDED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "BOARDED" => Some(BookingStatus::Boarded),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccurrenceStatus {
    Active,
    Cancelled,
}

impl OccurrenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceStatus::Active => "ACTIVE",
            OccurrenceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(OccurrenceStatus::Active),
            "CANCELLED" => Some(OccurrenceStatus::Cancelled),
            _ => None,
        }
    }
}

/// One concrete, dated, bookable instance of a template.
///
/// Materialized lazily on the first booking request for its date.
/// `booked_seats` is a denormalized tally of CONFIRMED/BOARDED bookings,
/// recomputed inside every mutating transaction rather than incremented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripOccurrence {
    pub id: Uuid,
    pub template_id: Uuid,
    pub travel_date: NaiveDate,
    pub booked_seats: u32,
    pub status: OccurrenceStatus,
    pub created_at: DateTime<Utc>,
}

/// Passenger identity attached to a booking. Contact fields are masked in
/// Debug/Display output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerDetails {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub emergency_contact: Option<Masked<String>>,
    pub special_request: Option<String>,
}

/// One seat on one occurrence. Bookings are never physically deleted;
/// cancellation is a status transition that frees the seat for resale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub occurrence_id: Uuid,
    /// Denormalized from the occurrence for query convenience.
    pub template_id: Uuid,
    pub travel_date: NaiveDate,
    pub passenger: PassengerDetails,
    pub seat_number: u32,
    pub reservation_code: String,
    pub amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recorded payment for a paid booking. The engine only creates these; it
/// does not manage a payment lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// A request to book a batch of seats on one occurrence for one party.
/// The batch is atomic: either every seat is booked or none are.
#[derive(Debug, Clone, Deserialize)]
pub struct BookSeatsRequest {
    pub occurrence_id: Uuid,
    pub passenger: PassengerDetails,
    pub seats: BTreeSet<u32>,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Dashboard filter for upcoming occurrences.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceFilter {
    pub from_date: Option<NaiveDate>,
    pub template_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Read-model row for the dashboard listing.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceSummary {
    pub occurrence_id: Uuid,
    pub template_id: Uuid,
    pub travel_date: NaiveDate,
    pub pickup_city_id: Uuid,
    pub dropoff_city_id: Uuid,
    pub departure_time: NaiveTime,
    pub seat_capacity: u32,
    pub booked_seats: u32,
    pub seats_free: u32,
}
