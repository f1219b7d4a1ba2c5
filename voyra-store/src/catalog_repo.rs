use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::PgPool;
use uuid::Uuid;

use voyra_booking::{BookingResult, CatalogRepository};
use voyra_catalog::{City, TimeSlot, Vehicle, VehicleType};

use crate::template_repo::map_db_err;

/// Read-only lookups against the reference catalog tables. Managed outside
/// the engine; the engine only consumes them.
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CityRow {
    id: Uuid,
    name: String,
    region: Option<String>,
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    vehicle_type_id: Uuid,
    registration: String,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct VehicleTypeRow {
    id: Uuid,
    name: String,
    seat_capacity: i32,
}

#[derive(sqlx::FromRow)]
struct TimeSlotRow {
    id: Uuid,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_city(&self, id: Uuid) -> BookingResult<Option<City>> {
        let row = sqlx::query_as::<_, CityRow>("SELECT id, name, region FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.map(|r| City {
            id: r.id,
            name: r.name,
            region: r.region,
        }))
    }

    async fn get_vehicle(&self, id: Uuid) -> BookingResult<Option<Vehicle>> {
        let row = sqlx::query_as::<_, VehicleRow>(
            "SELECT id, vehicle_type_id, registration, is_active FROM vehicles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(|r| Vehicle {
            id: r.id,
            vehicle_type_id: r.vehicle_type_id,
            registration: r.registration,
            is_active: r.is_active,
        }))
    }

    async fn get_vehicle_type(&self, id: Uuid) -> BookingResult<Option<VehicleType>> {
        let row = sqlx::query_as::<_, VehicleTypeRow>(
            "SELECT id, name, seat_capacity FROM vehicle_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(|r| VehicleType {
            id: r.id,
            name: r.name,
            seat_capacity: r.seat_capacity.max(0) as u32,
        }))
    }

    async fn get_time_slot(&self, id: Uuid) -> BookingResult<Option<TimeSlot>> {
        let row = sqlx::query_as::<_, TimeSlotRow>(
            "SELECT id, departure_time, arrival_time FROM time_slots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(|r| TimeSlot {
            id: r.id,
            departure_time: r.departure_time,
            arrival_time: r.arrival_time,
        }))
    }
}
