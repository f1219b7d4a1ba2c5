use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A city served by the operator. Reference data, read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub region: Option<String>,
}

/// A vehicle class with a fixed seat capacity. The capacity keys into the
/// seat layout table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleType {
    pub id: Uuid,
    pub name: String,
    pub seat_capacity: u32,
}

/// A physical vehicle of some class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub vehicle_type_id: Uuid,
    pub registration: String,
    pub is_active: bool,
}

/// Departure/arrival clock times for a recurring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
}
