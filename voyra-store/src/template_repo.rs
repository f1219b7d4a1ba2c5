use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

use voyra_booking::{BookingError, BookingResult, TemplateRepository};
use voyra_schedule::{DayOfWeek, NewTripTemplate, RecurrenceKind, TemplateStatus, TripTemplate};

pub struct PgTemplateRepository {
    pool: PgPool,
}

impl PgTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const TEMPLATE_COLUMNS: &str = "id, pickup_city_id, dropoff_city_id, vehicle_id, \
     vehicle_type_id, seat_capacity, time_slot_id, departure_time, arrival_time, price_amount, \
     currency, recurrence, weekly_days, start_date, end_date, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct TemplateRow {
    id: Uuid,
    pickup_city_id: Uuid,
    dropoff_city_id: Uuid,
    vehicle_id: Uuid,
    vehicle_type_id: Uuid,
    seat_capacity: i32,
    time_slot_id: Uuid,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    price_amount: i64,
    currency: String,
    recurrence: String,
    weekly_days: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Translate storage failures into the engine taxonomy. Unique-constraint
/// violations surface as retryable conflicts, never as success.
pub(crate) fn map_db_err(err: sqlx::Error) -> BookingError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            BookingError::ConcurrencyConflict(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut => {
            BookingError::StorageUnavailable("connection pool timed out".to_string())
        }
        _ => BookingError::StorageUnavailable(err.to_string()),
    }
}

pub(crate) fn template_from_row(row: TemplateRow) -> BookingResult<TripTemplate> {
    let recurrence = RecurrenceKind::parse(&row.recurrence).ok_or_else(|| {
        BookingError::Internal(format!("unknown recurrence kind: {}", row.recurrence))
    })?;
    let status = TemplateStatus::parse(&row.status).ok_or_else(|| {
        BookingError::Internal(format!("unknown template status: {}", row.status))
    })?;
    let weekly_days = row
        .weekly_days
        .iter()
        .map(|day| {
            DayOfWeek::parse(day)
                .ok_or_else(|| BookingError::Internal(format!("unknown weekday: {}", day)))
        })
        .collect::<BookingResult<BTreeSet<DayOfWeek>>>()?;

    Ok(TripTemplate {
        id: row.id,
        pickup_city_id: row.pickup_city_id,
        dropoff_city_id: row.dropoff_city_id,
        vehicle_id: row.vehicle_id,
        vehicle_type_id: row.vehicle_type_id,
        seat_capacity: row.seat_capacity as u32,
        time_slot_id: row.time_slot_id,
        departure_time: row.departure_time,
        arrival_time: row.arrival_time,
        price_amount: row.price_amount,
        currency: row.currency,
        recurrence,
        weekly_days,
        start_date: row.start_date,
        end_date: row.end_date,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn weekday_column(template: &TripTemplate) -> Vec<String> {
    template
        .weekly_days
        .iter()
        .map(|day| day.as_str().to_string())
        .collect()
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn create_template(&self, template: &TripTemplate) -> BookingResult<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO trip_templates (id, pickup_city_id, dropoff_city_id, vehicle_id,
                vehicle_type_id, seat_capacity, time_slot_id, departure_time, arrival_time,
                price_amount, currency, recurrence, weekly_days, start_date, end_date, status,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(template.id)
        .bind(template.pickup_city_id)
        .bind(template.dropoff_city_id)
        .bind(template.vehicle_id)
        .bind(template.vehicle_type_id)
        .bind(template.seat_capacity as i32)
        .bind(template.time_slot_id)
        .bind(template.departure_time)
        .bind(template.arrival_time)
        .bind(template.price_amount)
        .bind(&template.currency)
        .bind(template.recurrence.as_str())
        .bind(weekday_column(template))
        .bind(template.start_date)
        .bind(template.end_date)
        .bind(template.status.as_str())
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(template.id)
    }

    async fn get_template(&self, id: Uuid) -> BookingResult<Option<TripTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM trip_templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(template_from_row).transpose()
    }

    async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> BookingResult<Vec<TripTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM trip_templates WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC",
            TEMPLATE_COLUMNS
        ))
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(template_from_row).collect()
    }

    async fn update_template(&self, id: Uuid, new: NewTripTemplate) -> BookingResult<TripTemplate> {
        let existing = self
            .get_template(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("template {}", id)))?;

        let revised = TripTemplate::revise(id, existing.status, existing.created_at, new)?;

        sqlx::query(
            r#"
            UPDATE trip_templates
            SET pickup_city_id = $1, dropoff_city_id = $2, vehicle_id = $3, vehicle_type_id = $4,
                seat_capacity = $5, time_slot_id = $6, departure_time = $7, arrival_time = $8,
                price_amount = $9, currency = $10, recurrence = $11, weekly_days = $12,
                start_date = $13, end_date = $14, updated_at = $15
            WHERE id = $16
            "#,
        )
        .bind(revised.pickup_city_id)
        .bind(revised.dropoff_city_id)
        .bind(revised.vehicle_id)
        .bind(revised.vehicle_type_id)
        .bind(revised.seat_capacity as i32)
        .bind(revised.time_slot_id)
        .bind(revised.departure_time)
        .bind(revised.arrival_time)
        .bind(revised.price_amount)
        .bind(&revised.currency)
        .bind(revised.recurrence.as_str())
        .bind(weekday_column(&revised))
        .bind(revised.start_date)
        .bind(revised.end_date)
        .bind(revised.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(revised)
    }

    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> BookingResult<()> {
        let result = sqlx::query(
            "UPDATE trip_templates SET status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound(format!("template {}", id)));
        }
        Ok(())
    }
}
