use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use voyra_booking::inventory;
use voyra_booking::{
    BookSeatsRequest, Booking, BookingError, BookingResult, BookingStatus, CodeGenerator,
    OccurrenceFilter, OccurrenceStatus, OccurrenceSummary, PassengerDetails, Payment,
    PaymentStatus, ScheduleStore, TripOccurrence,
};
use voyra_booking::lifecycle::plan_transition;
use voyra_catalog::SeatLayout;
use voyra_schedule::{occurs_on, TripTemplate};
use voyra_shared::Masked;

use crate::template_repo::{map_db_err, template_from_row, TemplateRow, TEMPLATE_COLUMNS};

/// Postgres-backed scheduling and seat inventory store.
///
/// Every multi-step mutation runs inside one transaction; the occurrence row
/// is locked first so concurrent batches for the same departure serialize,
/// and the partial unique index on live (occurrence, seat) pairs turns any
/// remaining race into a reported conflict instead of a double booking.
pub struct PgScheduleStore {
    pool: PgPool,
    codes: CodeGenerator,
}

impl PgScheduleStore {
    pub fn new(pool: PgPool, codes: CodeGenerator) -> Self {
        Self { pool, codes }
    }
}

#[derive(sqlx::FromRow)]
struct OccurrenceRow {
    id: Uuid,
    template_id: Uuid,
    travel_date: NaiveDate,
    booked_seats: i32,
    status: String,
    created_at: DateTime<Utc>,
}

const BOOKING_COLUMNS: &str = "id, occurrence_id, template_id, travel_date, passenger_name, \
     passenger_email, passenger_phone, emergency_contact, special_request, seat_number, \
     reservation_code, amount, currency, status, payment_status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    occurrence_id: Uuid,
    template_id: Uuid,
    travel_date: NaiveDate,
    passenger_name: String,
    passenger_email: String,
    passenger_phone: String,
    emergency_contact: Option<String>,
    special_request: Option<String>,
    seat_number: i32,
    reservation_code: String,
    amount: i64,
    currency: String,
    status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    occurrence_id: Uuid,
    template_id: Uuid,
    travel_date: NaiveDate,
    pickup_city_id: Uuid,
    dropoff_city_id: Uuid,
    departure_time: NaiveTime,
    seat_capacity: i32,
    booked_seats: i32,
    held_seats: i64,
}

fn occurrence_from_row(row: OccurrenceRow) -> BookingResult<TripOccurrence> {
    let status = OccurrenceStatus::parse(&row.status).ok_or_else(|| {
        BookingError::Internal(format!("unknown occurrence status: {}", row.status))
    })?;
    Ok(TripOccurrence {
        id: row.id,
        template_id: row.template_id,
        travel_date: row.travel_date,
        booked_seats: row.booked_seats.max(0) as u32,
        status,
        created_at: row.created_at,
    })
}

fn booking_from_row(row: BookingRow) -> BookingResult<Booking> {
    let status = BookingStatus::parse(&row.status)
        .ok_or_else(|| BookingError::Internal(format!("unknown booking status: {}", row.status)))?;
    let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
        BookingError::Internal(format!("unknown payment status: {}", row.payment_status))
    })?;
    Ok(Booking {
        id: row.id,
        occurrence_id: row.occurrence_id,
        template_id: row.template_id,
        travel_date: row.travel_date,
        passenger: PassengerDetails {
            full_name: row.passenger_name,
            email: Masked(row.passenger_email),
            phone: Masked(row.passenger_phone),
            emergency_contact: row.emergency_contact.map(Masked),
            special_request: row.special_request,
        },
        seat_number: row.seat_number.max(0) as u32,
        reservation_code: row.reservation_code,
        amount: row.amount,
        currency: row.currency,
        status,
        payment_status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

async fn fetch_template_tx(
    tx: &mut Transaction<'_, Postgres>,
    template_id: Uuid,
) -> BookingResult<Option<TripTemplate>> {
    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        "SELECT {} FROM trip_templates WHERE id = $1",
        TEMPLATE_COLUMNS
    ))
    .bind(template_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_db_err)?;

    row.map(template_from_row).transpose()
}

/// Seats currently held by live bookings on an occurrence. Callers must hold
/// the occurrence row lock for the result to stay valid.
async fn held_seats_tx(
    tx: &mut Transaction<'_, Postgres>,
    occurrence_id: Uuid,
) -> BookingResult<BTreeSet<u32>> {
    let seats: Vec<i32> = sqlx::query_scalar(
        "SELECT seat_number FROM bookings \
         WHERE occurrence_id = $1 AND status <> 'CANCELLED' AND payment_status <> 'CANCELLED'",
    )
    .bind(occurrence_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_db_err)?;

    Ok(seats.into_iter().map(|seat| seat.max(0) as u32).collect())
}

/// Recompute the denormalized counter from booking rows, never increment it.
async fn recompute_booked_seats(
    tx: &mut Transaction<'_, Postgres>,
    occurrence_id: Uuid,
) -> BookingResult<()> {
    sqlx::query(
        "UPDATE trip_occurrences \
         SET booked_seats = (SELECT COUNT(*) FROM bookings \
             WHERE occurrence_id = $1 AND status IN ('CONFIRMED', 'BOARDED')) \
         WHERE id = $1",
    )
    .bind(occurrence_id)
    .execute(&mut **tx)
    .await
    .map_err(map_db_err)?;
    Ok(())
}

async fn insert_booking(
    tx: &mut Transaction<'_, Postgres>,
    booking: &Booking,
) -> BookingResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bookings (id, occurrence_id, template_id, travel_date, passenger_name,
            passenger_email, passenger_phone, emergency_contact, special_request, seat_number,
            reservation_code, amount, currency, status, payment_status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(booking.id)
    .bind(booking.occurrence_id)
    .bind(booking.template_id)
    .bind(booking.travel_date)
    .bind(&booking.passenger.full_name)
    .bind(booking.passenger.email.expose())
    .bind(booking.passenger.phone.expose())
    .bind(
        booking
            .passenger
            .emergency_contact
            .as_ref()
            .map(|contact| contact.expose().clone()),
    )
    .bind(&booking.passenger.special_request)
    .bind(booking.seat_number as i32)
    .bind(&booking.reservation_code)
    .bind(booking.amount)
    .bind(&booking.currency)
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(map_db_err)?;
    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> BookingResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, booking_id, amount, currency, method, reference, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.method)
    .bind(&payment.reference)
    .bind(payment.status.as_str())
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_db_err)?;
    Ok(())
}

/// Collision-checked reservation code, bounded retries. Earlier inserts of
/// the same transaction are visible to the probe, so batch-internal
/// collisions are caught too.
async fn allocate_code(
    tx: &mut Transaction<'_, Postgres>,
    codes: &CodeGenerator,
) -> BookingResult<String> {
    for _ in 0..codes.max_attempts() {
        let candidate = codes.candidate();
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE reservation_code = $1)")
                .bind(&candidate)
                .fetch_one(&mut **tx)
                .await
                .map_err(map_db_err)?;
        if !exists {
            return Ok(candidate);
        }
    }
    Err(BookingError::CodeGenerationFailed {
        attempts: codes.max_attempts(),
    })
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn get_or_create_occurrence(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> BookingResult<TripOccurrence> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM trip_templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        let template = row
            .map(template_from_row)
            .transpose()?
            .ok_or_else(|| BookingError::NotFound(format!("template {}", template_id)))?;

        if !template.is_active() {
            return Err(BookingError::Validation(format!(
                "Template {} is not active",
                template_id
            )));
        }
        if !occurs_on(&template, date) {
            return Err(BookingError::Validation(format!(
                "No departure on {} for this template",
                date
            )));
        }

        // Insert-or-fetch: the unique constraint on (template_id, travel_date)
        // makes a concurrent first booking converge on one row.
        sqlx::query(
            "INSERT INTO trip_occurrences (id, template_id, travel_date, booked_seats, status) \
             VALUES ($1, $2, $3, 0, 'ACTIVE') \
             ON CONFLICT (template_id, travel_date) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(template_id)
        .bind(date)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        let row = sqlx::query_as::<_, OccurrenceRow>(
            "SELECT id, template_id, travel_date, booked_seats, status, created_at \
             FROM trip_occurrences WHERE template_id = $1 AND travel_date = $2",
        )
        .bind(template_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        occurrence_from_row(row)
    }

    async fn book_seats(&self, request: BookSeatsRequest) -> BookingResult<Vec<Booking>> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // 1. Lock the occurrence row: concurrent batches for the same
        //    departure serialize here.
        let row = sqlx::query_as::<_, OccurrenceRow>(
            "SELECT id, template_id, travel_date, booked_seats, status, created_at \
             FROM trip_occurrences WHERE id = $1 FOR UPDATE",
        )
        .bind(request.occurrence_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let occurrence = row
            .map(occurrence_from_row)
            .transpose()?
            .ok_or_else(|| {
                BookingError::NotFound(format!("occurrence {}", request.occurrence_id))
            })?;
        if occurrence.status != OccurrenceStatus::Active {
            return Err(BookingError::Validation(
                "Occurrence is cancelled".to_string(),
            ));
        }

        let template = fetch_template_tx(&mut tx, occurrence.template_id)
            .await?
            .ok_or_else(|| {
                BookingError::Internal(format!("template {} missing", occurrence.template_id))
            })?;
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

        // 2. Validate the batch against the seat plan, then against live
        //    bookings; any conflict aborts the whole batch.
        let layout = SeatLayout::for_capacity(template.seat_capacity);
        inventory::validate_seat_selection(&layout, &request.seats)?;

        let held = held_seats_tx(&mut tx, occurrence.id).await?;
        let conflicts = inventory::seat_conflicts(&request.seats, &held);
        if !conflicts.is_empty() {
            return Err(BookingError::SeatUnavailable { seats: conflicts });
        }

        // 3. Insert one booking per seat, plus payment rows when paid.
        let status = if request.payment_status == PaymentStatus::Paid {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };
        let method = request
            .payment_method
            .clone()
            .unwrap_or_else(|| "CASH".to_string());
        let now = Utc::now();

        let mut created = Vec::with_capacity(request.seats.len());
        for &seat in &request.seats {
            let code = allocate_code(&mut tx, &self.codes).await?;

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
            insert_booking(&mut tx, &booking).await?;

            if request.payment_status == PaymentStatus::Paid {
                let payment = Payment {
                    id: Uuid::new_v4(),
                    booking_id: booking.id,
                    amount: booking.amount,
                    currency: booking.currency.clone(),
                    method: method.clone(),
                    reference: booking.reservation_code.clone(),
                    status: PaymentStatus::Paid,
                    created_at: now,
                };
                insert_payment(&mut tx, &payment).await?;
            }
            created.push(booking);
        }

        // 4. Recompute the counter from booking rows and commit. Any earlier
        //    error dropped the transaction, rolling everything back.
        recompute_booked_seats(&mut tx, occurrence.id).await?;
        tx.commit().await.map_err(map_db_err)?;

        info!(
            occurrence_id = %occurrence.id,
            seats = created.len(),
            "Booked seat batch"
        );
        Ok(created)
    }

    async fn set_booking_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let mut booking = row
            .map(booking_from_row)
            .transpose()?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        let plan = plan_transition(booking.status, booking.payment_status, new_status)?;
        if !plan.changed {
            // Idempotent no-op (e.g. double cancel); nothing to write.
            return Ok(booking);
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE bookings SET status = $1, payment_status = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(plan.status.as_str())
        .bind(plan.payment_status.as_str())
        .bind(now)
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        recompute_booked_seats(&mut tx, booking.occurrence_id).await?;
        tx.commit().await.map_err(map_db_err)?;

        booking.status = plan.status;
        booking.payment_status = plan.payment_status;
        booking.updated_at = now;
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(booking_from_row).transpose()
    }

    async fn available_seats(&self, occurrence_id: Uuid) -> BookingResult<BTreeSet<u32>> {
        let capacity: Option<i32> = sqlx::query_scalar(
            "SELECT t.seat_capacity FROM trip_occurrences o \
             JOIN trip_templates t ON t.id = o.template_id WHERE o.id = $1",
        )
        .bind(occurrence_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        let capacity = capacity
            .ok_or_else(|| BookingError::NotFound(format!("occurrence {}", occurrence_id)))?;

        let seats: Vec<i32> = sqlx::query_scalar(
            "SELECT seat_number FROM bookings \
             WHERE occurrence_id = $1 AND status <> 'CANCELLED' AND payment_status <> 'CANCELLED'",
        )
        .bind(occurrence_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        let held: BTreeSet<u32> = seats.into_iter().map(|seat| seat.max(0) as u32).collect();

        let layout = SeatLayout::for_capacity(capacity.max(0) as u32);
        Ok(layout
            .bookable_seats()
            .into_iter()
            .filter(|seat| !held.contains(seat))
            .collect())
    }

    async fn list_upcoming(
        &self,
        filter: OccurrenceFilter,
    ) -> BookingResult<Vec<OccurrenceSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT o.id AS occurrence_id, o.template_id, o.travel_date,
                   t.pickup_city_id, t.dropoff_city_id, t.departure_time, t.seat_capacity,
                   o.booked_seats,
                   (SELECT COUNT(*) FROM bookings b
                        WHERE b.occurrence_id = o.id
                          AND b.status <> 'CANCELLED'
                          AND b.payment_status <> 'CANCELLED') AS held_seats
            FROM trip_occurrences o
            JOIN trip_templates t ON t.id = o.template_id
            WHERE o.status = 'ACTIVE'
              AND o.travel_date >= COALESCE($1, CURRENT_DATE)
              AND ($2::uuid IS NULL OR o.template_id = $2)
            ORDER BY o.travel_date, t.departure_time
            LIMIT $3
            "#,
        )
        .bind(filter.from_date)
        .bind(filter.template_id)
        .bind(filter.limit.unwrap_or(100).clamp(1, 500))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let layout = SeatLayout::for_capacity(row.seat_capacity.max(0) as u32);
                let bookable = layout.bookable_seats().len() as i64;
                OccurrenceSummary {
                    occurrence_id: row.occurrence_id,
                    template_id: row.template_id,
                    travel_date: row.travel_date,
                    pickup_city_id: row.pickup_city_id,
                    dropoff_city_id: row.dropoff_city_id,
                    departure_time: row.departure_time,
                    seat_capacity: row.seat_capacity.max(0) as u32,
                    booked_seats: row.booked_seats.max(0) as u32,
                    seats_free: (bookable - row.held_seats).max(0) as u32,
                }
            })
            .collect())
    }
}
