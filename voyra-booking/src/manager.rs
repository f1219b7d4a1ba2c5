use chrono::{NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;
use voyra_catalog::SeatLayout;
use voyra_schedule::{occurs_on, TripTemplate};

use crate::error::{BookingError, BookingResult};
use crate::inventory;
use crate::lifecycle::plan_transition;
use crate::models::{
    BookSeatsRequest, Booking, BookingStatus, OccurrenceFilter, OccurrenceStatus,
    OccurrenceSummary, Payment, PaymentStatus, TripOccurrence,
};
use crate::reservation::CodeGenerator;

/// In-memory rendition of the scheduling and seat inventory engine.
///
/// Enforces the same semantics as the Postgres store — lazy occurrence
/// materialization, atomic seat batches, counter recomputation, lifecycle
/// couplings — against plain maps. Used for unit-level verification and as
/// the backing for API tests that run without a database.
pub struct BookingManager {
    templates: HashMap<Uuid, TripTemplate>,
    occurrences: HashMap<Uuid, TripOccurrence>,
    by_template_date: HashMap<(Uuid, NaiveDate), Uuid>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<Payment>,
    issued_codes: HashSet<String>,
    codes: CodeGenerator,
}

impl BookingManager {
    pub fn new() -> Self {
        Self::with_code_generator(CodeGenerator::default())
    }

    pub fn with_code_generator(codes: CodeGenerator) -> Self {
        Self {
            templates: HashMap::new(),
            occurrences: HashMap::new(),
            by_template_date: HashMap::new(),
            bookings: HashMap::new(),
            payments: Vec::new(),
            issued_codes: HashSet::new(),
            codes,
        }
    }

    pub fn insert_template(&mut self, template: TripTemplate) {
        self.templates.insert(template.id, template);
    }

    pub fn template(&self, id: Uuid) -> Option<&TripTemplate> {
        self.templates.get(&id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &TripTemplate> {
        self.templates.values()
    }

    pub fn set_template_status(
        &mut self,
        id: Uuid,
        status: voyra_schedule::TemplateStatus,
    ) -> BookingResult<()> {
        let template = self
            .templates
            .get_mut(&id)
            .ok_or_else(|| BookingError::NotFound(format!("template {}", id)))?;
        template.status = status;
        template.updated_at = Utc::now();
        Ok(())
    }

    pub fn occurrence(&self, id: Uuid) -> Option<&TripOccurrence> {
        self.occurrences.get(&id)
    }

    pub fn booking(&self, id: Uuid) -> Option<&Booking> {
        self.bookings.get(&id)
    }

    pub fn payments_for(&self, booking_id: Uuid) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .collect()
    }

    /// Find or lazily create the occurrence for (template, date).
    pub fn get_or_create_occurrence(
        &mut self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> BookingResult<TripOccurrence> {
        let template = self
            .templates
            .get(&template_id)
            .ok_or_else(|| BookingError::NotFound(format!("template {}", template_id)))?;
        if !template.is_active() {
            return Err(BookingError::Validation(format!(
                "Template {} is not active",
                template_id
            )));
        }
        if !occurs_on(template, date) {
            return Err(BookingError::Validation(format!(
                "No departure on {} for this template",
                date
            )));
        }

        if let Some(id) = self.by_template_date.get(&(template_id, date)) {
            return Ok(self.occurrences[id].clone());
        }

        let occurrence = TripOccurrence {
            id: Uuid::new_v4(),
            template_id,
            travel_date: date,
            booked_seats: 0,
            status: OccurrenceStatus::Active,
            created_at: Utc::now(),
        };
        self.by_template_date
            .insert((template_id, date), occurrence.id);
        self.occurrences.insert(occurrence.id, occurrence.clone());
        Ok(occurrence)
    }

    /// Book a batch of seats on one occurrence, all-or-nothing.
    ///
    /// Validation, conflict detection and code generation all run before the
    /// first insert, so a failure at any step leaves the ledger untouched.
    pub fn book_seats(&mut self, request: BookSeatsRequest) -> BookingResult<Vec<Booking>> {
        let occurrence = self
            .occurrences
            .get(&request.occurrence_id)
            .ok_or_else(|| {
                BookingError::NotFound(format!("occurrence {}", request.occurrence_id))
            })?
            .clone();
        if occurrence.status != OccurrenceStatus::Active {
            return Err(BookingError::Validation(
                "Occurrence is cancelled".to_string(),
            ));
        }

        let template = self
            .templates
            .get(&occurrence.template_id)
            .ok_or_else(|| {
                BookingError::Internal(format!("template {} missing", occurrence.template_id))
            })?
            .clone();
        if !template.is_active() {
            return Err(BookingError::Validation(format!(
                "Template {} is not active",
                template.id
            )));
        }
        if request.payment_status == PaymentStatus::Cancelled {
            return Err(BookingError::Validation(
                "A new booking cannot start out payment-cancelled".to_string(),
            ));
        }

        let layout = SeatLayout::for_capacity(template.seat_capacity);
        inventory::validate_seat_selection(&layout, &request.seats)?;

        let held = inventory::held_seats(
            self.bookings
                .values()
                .filter(|b| b.occurrence_id == occurrence.id),
        );
        let conflicts = inventory::seat_conflicts(&request.seats, &held);
        if !conflicts.is_empty() {
            return Err(BookingError::SeatUnavailable { seats: conflicts });
        }

        // Reserve codes up front; a collision-exhaustion aborts the batch
        // before anything is written.
        let mut reserved_codes = Vec::with_capacity(request.seats.len());
        for _ in &request.seats {
            let code = self
                .codes
                .generate(|candidate| self.issued_codes.contains(candidate))?;
            self.issued_codes.insert(code.clone());
            reserved_codes.push(code);
        }

        let status = if request.payment_status == PaymentStatus::Paid {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };
        let now = Utc::now();
        let method = request
            .payment_method
            .clone()
            .unwrap_or_else(|| "CASH".to_string());

        let mut created = Vec::with_capacity(request.seats.len());
        for (&seat, code) in request.seats.iter().zip(reserved_codes) {
            let booking = Booking {
                id: Uuid::new_v4(),
                occurrence_id: occurrence.id,
                template_id: template.id,
                travel_date: occurrence.travel_date,
                passenger: request.passenger.clone(),
                seat_number: seat,
                reservation_code: code,
                amount: template.price_amount,
                currency: template.currency.clone(),
                status,
                payment_status: request.payment_status,
                created_at: now,
                updated_at: now,
            };
            if request.payment_status == PaymentStatus::Paid {
                self.payments.push(Payment {
                    id: Uuid::new_v4(),
                    booking_id: booking.id,
                    amount: booking.amount,
                    currency: booking.currency.clone(),
                    method: method.clone(),
                    reference: booking.reservation_code.clone(),
                    status: PaymentStatus::Paid,
                    created_at: now,
                });
            }
            self.bookings.insert(booking.id, booking.clone());
            created.push(booking);
        }

        self.recompute_counter(occurrence.id);
        Ok(created)
    }

    /// Apply a lifecycle transition and recompute the occurrence counter.
    pub fn set_booking_status(
        &mut self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> BookingResult<Booking> {
        let booking = self
            .bookings
            .get(&booking_id)
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;
        let plan = plan_transition(booking.status, booking.payment_status, new_status)?;
        if !plan.changed {
            return Ok(booking.clone());
        }

        let occurrence_id = booking.occurrence_id;
        let updated = {
            let booking = self
                .bookings
                .get_mut(&booking_id)
                .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;
            booking.status = plan.status;
            booking.payment_status = plan.payment_status;
            booking.updated_at = Utc::now();
            booking.clone()
        };
        self.recompute_counter(occurrence_id);
        Ok(updated)
    }

    pub fn available_seats(&self, occurrence_id: Uuid) -> BookingResult<BTreeSet<u32>> {
        let occurrence = self
            .occurrences
            .get(&occurrence_id)
            .ok_or_else(|| BookingError::NotFound(format!("occurrence {}", occurrence_id)))?;
        let template = self
            .templates
            .get(&occurrence.template_id)
            .ok_or_else(|| {
                BookingError::Internal(format!("template {} missing", occurrence.template_id))
            })?;
        let layout = SeatLayout::for_capacity(template.seat_capacity);
        Ok(inventory::available_seats(
            &layout,
            self.bookings
                .values()
                .filter(|b| b.occurrence_id == occurrence_id),
        ))
    }

    pub fn list_upcoming(&self, filter: &OccurrenceFilter) -> Vec<OccurrenceSummary> {
        let from = filter
            .from_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut rows: Vec<OccurrenceSummary> = self
            .occurrences
            .values()
            .filter(|o| o.status == OccurrenceStatus::Active && o.travel_date >= from)
            .filter(|o| {
                filter
                    .template_id
                    .map_or(true, |template_id| o.template_id == template_id)
            })
            .filter_map(|o| {
                let template = self.templates.get(&o.template_id)?;
                let layout = SeatLayout::for_capacity(template.seat_capacity);
                let held = inventory::held_seats(
                    self.bookings.values().filter(|b| b.occurrence_id == o.id),
                );
                Some(OccurrenceSummary {
                    occurrence_id: o.id,
                    template_id: o.template_id,
                    travel_date: o.travel_date,
                    pickup_city_id: template.pickup_city_id,
                    dropoff_city_id: template.dropoff_city_id,
                    departure_time: template.departure_time,
                    seat_capacity: template.seat_capacity,
                    booked_seats: o.booked_seats,
                    seats_free: (layout.bookable_seats().len() - held.len()) as u32,
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.travel_date, r.departure_time));
        if let Some(limit) = filter.limit {
            rows.truncate(limit.max(0) as usize);
        }
        rows
    }

    fn recompute_counter(&mut self, occurrence_id: Uuid) {
        let count = inventory::booked_seat_count(
            self.bookings
                .values()
                .filter(|b| b.occurrence_id == occurrence_id),
        );
        if let Some(occurrence) = self.occurrences.get_mut(&occurrence_id) {
            occurrence.booked_seats = count;
        }
    }
}

impl Default for BookingManager {
    fn default() -> Self {
        Self::new()
    }
}
