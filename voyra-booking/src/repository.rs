use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use uuid::Uuid;
use voyra_catalog::{City, TimeSlot, Vehicle, VehicleType};
use voyra_schedule::{NewTripTemplate, TemplateStatus, TripTemplate};

use crate::error::BookingResult;
use crate::models::{
    BookSeatsRequest, Booking, BookingStatus, OccurrenceFilter, OccurrenceSummary, TripOccurrence,
};

/// Read-only access to the reference catalog. The engine denormalizes seat
/// capacity and slot times from here onto templates; it never writes back.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_city(&self, id: Uuid) -> BookingResult<Option<City>>;

    async fn get_vehicle(&self, id: Uuid) -> BookingResult<Option<Vehicle>>;

    async fn get_vehicle_type(&self, id: Uuid) -> BookingResult<Option<VehicleType>>;

    async fn get_time_slot(&self, id: Uuid) -> BookingResult<Option<TimeSlot>>;
}

/// Persistence contract for the trip template store.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create_template(&self, template: &TripTemplate) -> BookingResult<Uuid>;

    async fn get_template(&self, id: Uuid) -> BookingResult<Option<TripTemplate>>;

    async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> BookingResult<Vec<TripTemplate>>;

    /// Full edit: input is re-validated by the caller via
    /// [`TripTemplate::revise`] before it reaches the store.
    async fn update_template(&self, id: Uuid, new: NewTripTemplate) -> BookingResult<TripTemplate>;

    /// Soft lifecycle changes only; templates are never physically removed.
    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> BookingResult<()>;
}

/// Persistence contract for occurrences, bookings and payments.
///
/// All seat mutation funnels through `book_seats` and `set_booking_status`
/// so the inventory invariants hold no matter which caller (self-service or
/// admin) initiates the change.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Race-safe lazy materialization: repeated calls for the same
    /// (template, date) return the same occurrence.
    async fn get_or_create_occurrence(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> BookingResult<TripOccurrence>;

    /// Atomically book a batch of seats; all seats succeed or none do.
    async fn book_seats(&self, request: BookSeatsRequest) -> BookingResult<Vec<Booking>>;

    /// Apply a lifecycle transition and recompute the occurrence counter in
    /// the same transaction.
    async fn set_booking_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> BookingResult<Booking>;

    async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>>;

    /// Bookable seats not currently held by a live booking.
    async fn available_seats(&self, occurrence_id: Uuid) -> BookingResult<BTreeSet<u32>>;

    /// Read-only dashboard feed.
    async fn list_upcoming(&self, filter: OccurrenceFilter)
        -> BookingResult<Vec<OccurrenceSummary>>;
}
