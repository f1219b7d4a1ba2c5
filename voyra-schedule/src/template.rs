use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::recurrence::compute_end_date;

/// Lifecycle status of a trip template. Templates are never physically
/// removed; "delete" is a transition to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    Active,
    Inactive,
    Cancelled,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Active => "ACTIVE",
            TemplateStatus::Inactive => "INACTIVE",
            TemplateStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(TemplateStatus::Active),
            "INACTIVE" => Some(TemplateStatus::Inactive),
            "CANCELLED" => Some(TemplateStatus::Cancelled),
            _ => None,
        }
    }
}

/// Recurrence policy of a template. A fixed closed set, not a general
/// rrule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceKind {
    SingleDay,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::SingleDay => "SINGLE_DAY",
            RecurrenceKind::Weekly => "WEEKLY",
            RecurrenceKind::Monthly => "MONTHLY",
            RecurrenceKind::Yearly => "YEARLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SINGLE_DAY" => Some(RecurrenceKind::SingleDay),
            "WEEKLY" => Some(RecurrenceKind::Weekly),
            "MONTHLY" => Some(RecurrenceKind::Monthly),
            "YEARLY" => Some(RecurrenceKind::Yearly),
            _ => None,
        }
    }
}

/// Weekday names as stored on weekly templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MONDAY" => Some(DayOfWeek::Monday),
            "TUESDAY" => Some(DayOfWeek::Tuesday),
            "WEDNESDAY" => Some(DayOfWeek::Wednesday),
            "THURSDAY" => Some(DayOfWeek::Thursday),
            "FRIDAY" => Some(DayOfWeek::Friday),
            "SATURDAY" => Some(DayOfWeek::Saturday),
            "SUNDAY" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Pickup and dropoff city must differ")]
    SameCities,

    #[error("Price must be positive, got {0}")]
    NonPositivePrice(i64),

    #[error("Seat capacity must be positive")]
    ZeroCapacity,
}

/// The recurring trip definition: route, vehicle, slot, price and
/// recurrence rule. Seat capacity and slot times are denormalized from the
/// reference catalog at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripTemplate {
    pub id: Uuid,
    pub pickup_city_id: Uuid,
    pub dropoff_city_id: Uuid,
    pub vehicle_id: Uuid,
    pub vehicle_type_id: Uuid,
    pub seat_capacity: u32,
    pub time_slot_id: Uuid,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub price_amount: i64,
    pub currency: String,
    pub recurrence: RecurrenceKind,
    /// Only meaningful for weekly templates. May be empty, in which case the
    /// template never produces an occurrence.
    pub weekly_days: BTreeSet<DayOfWeek>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operator input for creating or editing a template. The validity window's
/// `end_date` is always derived, never supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTripTemplate {
    pub pickup_city_id: Uuid,
    pub dropoff_city_id: Uuid,
    pub vehicle_id: Uuid,
    pub vehicle_type_id: Uuid,
    pub seat_capacity: u32,
    pub time_slot_id: Uuid,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub price_amount: i64,
    pub currency: String,
    pub recurrence: RecurrenceKind,
    #[serde(default)]
    pub weekly_days: BTreeSet<DayOfWeek>,
    pub start_date: NaiveDate,
}

impl TripTemplate {
    /// Validate operator input and build a fresh active template.
    pub fn create(new: NewTripTemplate) -> Result<Self, TemplateError> {
        Self::build(Uuid::new_v4(), TemplateStatus::Active, Utc::now(), new)
    }

    /// Re-validate operator input against an existing template's identity,
    /// preserving its id, status and creation timestamp.
    pub fn revise(
        id: Uuid,
        status: TemplateStatus,
        created_at: DateTime<Utc>,
        new: NewTripTemplate,
    ) -> Result<Self, TemplateError> {
        Self::build(id, status, created_at, new)
    }

    fn build(
        id: Uuid,
        status: TemplateStatus,
        created_at: DateTime<Utc>,
        new: NewTripTemplate,
    ) -> Result<Self, TemplateError> {
        if new.pickup_city_id == new.dropoff_city_id {
            return Err(TemplateError::SameCities);
        }
        if new.price_amount <= 0 {
            return Err(TemplateError::NonPositivePrice(new.price_amount));
        }
        if new.seat_capacity == 0 {
            return Err(TemplateError::ZeroCapacity);
        }

        let end_date = compute_end_date(new.recurrence, new.start_date);
        // Weekly day-sets only matter for weekly templates; anything carried
        // over from a different recurrence kind is dropped.
        let weekly_days = match new.recurrence {
            RecurrenceKind::Weekly => new.weekly_days,
            _ => BTreeSet::new(),
        };

        Ok(Self {
            id,
            pickup_city_id: new.pickup_city_id,
            dropoff_city_id: new.dropoff_city_id,
            vehicle_id: new.vehicle_id,
            vehicle_type_id: new.vehicle_type_id,
            seat_capacity: new.seat_capacity,
            time_slot_id: new.time_slot_id,
            departure_time: new.departure_time,
            arrival_time: new.arrival_time,
            price_amount: new.price_amount,
            currency: new.currency,
            recurrence: new.recurrence,
            weekly_days,
            start_date: new.start_date,
            end_date,
            status,
            created_at,
            updated_at: Utc::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == TemplateStatus::Active
    }
}
