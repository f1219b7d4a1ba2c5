use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

use voyra_api::{app, AppState};
use voyra_booking::{
    BookSeatsRequest, Booking, BookingError, BookingManager, BookingResult, BookingStatus,
    CatalogRepository, OccurrenceFilter, OccurrenceSummary, ScheduleStore, TemplateRepository,
    TripOccurrence,
};
use voyra_catalog::{City, TimeSlot, Vehicle, VehicleType};
use voyra_schedule::{NewTripTemplate, TemplateStatus, TripTemplate};

/// The engine behind the HTTP surface, backed by in-memory state so the
/// full request path can be exercised without a database.
struct InMemoryEngine {
    cities: HashMap<Uuid, City>,
    vehicles: HashMap<Uuid, Vehicle>,
    vehicle_types: HashMap<Uuid, VehicleType>,
    time_slots: HashMap<Uuid, TimeSlot>,
    inner: Mutex<BookingManager>,
}

#[derive(Clone, Copy)]
struct Seed {
    pickup_city: Uuid,
    dropoff_city: Uuid,
    vehicle: Uuid,
    time_slot: Uuid,
}

fn seeded_engine() -> (InMemoryEngine, Seed) {
    let seed = Seed {
        pickup_city: Uuid::new_v4(),
        dropoff_city: Uuid::new_v4(),
        vehicle: Uuid::new_v4(),
        time_slot: Uuid::new_v4(),
    };
    let vehicle_type_id = Uuid::new_v4();

    let mut cities = HashMap::new();
    cities.insert(
        seed.pickup_city,
        City {
            id: seed.pickup_city,
            name: "Arusha".to_string(),
            region: None,
        },
    );
    cities.insert(
        seed.dropoff_city,
        City {
            id: seed.dropoff_city,
            name: "Moshi".to_string(),
            region: None,
        },
    );

    let mut vehicle_types = HashMap::new();
    vehicle_types.insert(
        vehicle_type_id,
        VehicleType {
            id: vehicle_type_id,
            name: "Minibus".to_string(),
            seat_capacity: 14,
        },
    );

    let mut vehicles = HashMap::new();
    vehicles.insert(
        seed.vehicle,
        Vehicle {
            id: seed.vehicle,
            vehicle_type_id,
            registration: "T 123 ABC".to_string(),
            is_active: true,
        },
    );

    let mut time_slots = HashMap::new();
    time_slots.insert(
        seed.time_slot,
        TimeSlot {
            id: seed.time_slot,
            departure_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        },
    );

    let engine = InMemoryEngine {
        cities,
        vehicles,
        vehicle_types,
        time_slots,
        inner: Mutex::new(BookingManager::new()),
    };
    (engine, seed)
}

#[async_trait]
impl CatalogRepository for InMemoryEngine {
    async fn get_city(&self, id: Uuid) -> BookingResult<Option<City>> {
        Ok(self.cities.get(&id).cloned())
    }

    async fn get_vehicle(&self, id: Uuid) -> BookingResult<Option<Vehicle>> {
        Ok(self.vehicles.get(&id).cloned())
    }

    async fn get_vehicle_type(&self, id: Uuid) -> BookingResult<Option<VehicleType>> {
        Ok(self.vehicle_types.get(&id).cloned())
    }

    async fn get_time_slot(&self, id: Uuid) -> BookingResult<Option<TimeSlot>> {
        Ok(self.time_slots.get(&id).cloned())
    }
}

#[async_trait]
impl TemplateRepository for InMemoryEngine {
    async fn create_template(&self, template: &TripTemplate) -> BookingResult<Uuid> {
        let mut manager = self.inner.lock().unwrap();
        manager.insert_template(template.clone());
        Ok(template.id)
    }

    async fn get_template(&self, id: Uuid) -> BookingResult<Option<TripTemplate>> {
        Ok(self.inner.lock().unwrap().template(id).cloned())
    }

    async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> BookingResult<Vec<TripTemplate>> {
        let manager = self.inner.lock().unwrap();
        Ok(manager
            .templates()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update_template(&self, id: Uuid, new: NewTripTemplate) -> BookingResult<TripTemplate> {
        let mut manager = self.inner.lock().unwrap();
        let existing = manager
            .template(id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("template {}", id)))?;
        let revised = TripTemplate::revise(id, existing.status, existing.created_at, new)?;
        manager.insert_template(revised.clone());
        Ok(revised)
    }

    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> BookingResult<()> {
        self.inner.lock().unwrap().set_template_status(id, status)
    }
}

#[async_trait]
impl ScheduleStore for InMemoryEngine {
    async fn get_or_create_occurrence(
        &self,
        template_id: Uuid,
        date: NaiveDate,
    ) -> BookingResult<TripOccurrence> {
        self.inner
            .lock()
            .unwrap()
            .get_or_create_occurrence(template_id, date)
    }

    async fn book_seats(&self, request: BookSeatsRequest) -> BookingResult<Vec<Booking>> {
        self.inner.lock().unwrap().book_seats(request)
    }

    async fn set_booking_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> BookingResult<Booking> {
        self.inner
            .lock()
            .unwrap()
            .set_booking_status(booking_id, new_status)
    }

    async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Option<Booking>> {
        Ok(self.inner.lock().unwrap().booking(booking_id).cloned())
    }

    async fn available_seats(&self, occurrence_id: Uuid) -> BookingResult<BTreeSet<u32>> {
        self.inner.lock().unwrap().available_seats(occurrence_id)
    }

    async fn list_upcoming(
        &self,
        filter: OccurrenceFilter,
    ) -> BookingResult<Vec<OccurrenceSummary>> {
        Ok(self.inner.lock().unwrap().list_upcoming(&filter))
    }
}

fn test_app() -> (Router, Seed) {
    let (engine, seed) = seeded_engine();
    let engine = Arc::new(engine);
    let router = app(AppState {
        catalog: engine.clone(),
        templates: engine.clone(),
        schedule: engine,
    });
    (router, seed)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn monday_template_body(seed: &Seed) -> Value {
    json!({
        "pickup_city_id": seed.pickup_city,
        "dropoff_city_id": seed.dropoff_city,
        "vehicle_id": seed.vehicle,
        "time_slot_id": seed.time_slot,
        "price_amount": 5000,
        "currency": "TZS",
        "recurrence": "WEEKLY",
        "weekly_days": ["MONDAY"],
        "start_date": "2024-01-01"
    })
}

fn booking_body(occurrence_id: &str, seats: &[u32], payment_status: &str) -> Value {
    json!({
        "occurrence_id": occurrence_id,
        "passenger": {
            "full_name": "Asha Mtui",
            "email": "asha@example.com",
            "phone": "+255700000001",
            "emergency_contact": null,
            "special_request": null
        },
        "seats": seats,
        "payment_status": payment_status,
        "payment_method": "MOBILE_MONEY"
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_template_crud_and_dates() {
    let (app, seed) = test_app();

    let (status, template) = send(
        &app,
        "POST",
        "/v1/templates",
        Some(monday_template_body(&seed)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = template["id"].as_str().unwrap().to_string();
    assert_eq!(template["end_date"], "2024-01-07");
    assert_eq!(template["status"], "ACTIVE");
    // Capacity and slot times come from the catalog, not the request.
    assert_eq!(template["seat_capacity"], 14);
    assert_eq!(template["departure_time"], "08:30:00");

    let (status, listed) = send(&app, "GET", "/v1/templates?status=ACTIVE", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, dates) = send(
        &app,
        "GET",
        &format!("/v1/templates/{}/dates?from=2024-01-01&limit=5", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates, json!(["2024-01-01"]));

    let (status, _) = send(&app, "DELETE", &format!("/v1/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, fetched) = send(&app, "GET", &format!("/v1/templates/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "INACTIVE");

    // Deactivated templates no longer materialize occurrences.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/occurrences",
        Some(json!({ "template_id": id, "travel_date": "2024-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_template_validation_rejects_same_cities() {
    let (app, seed) = test_app();
    let mut body = monday_template_body(&seed);
    body["dropoff_city_id"] = body["pickup_city_id"].clone();
    let (status, err) = send(&app, "POST", "/v1/templates", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("differ"));
}

#[tokio::test]
async fn test_template_rejects_unknown_vehicle() {
    let (app, seed) = test_app();
    let mut body = monday_template_body(&seed);
    body["vehicle_id"] = json!(Uuid::new_v4());
    let (status, err) = send(&app, "POST", "/v1/templates", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("vehicle"));
}

#[tokio::test]
async fn test_booking_flow_end_to_end() {
    let (app, seed) = test_app();

    let (_, template) = send(
        &app,
        "POST",
        "/v1/templates",
        Some(monday_template_body(&seed)),
    )
    .await;
    let template_id = template["id"].as_str().unwrap().to_string();

    // Wednesday is not in the day-set.
    let (status, err) = send(
        &app,
        "POST",
        "/v1/occurrences",
        Some(json!({ "template_id": template_id, "travel_date": "2024-01-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("2024-01-03"));

    // Monday works, and materialization is idempotent.
    let (status, occurrence) = send(
        &app,
        "POST",
        "/v1/occurrences",
        Some(json!({ "template_id": template_id, "travel_date": "2024-01-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let occurrence_id = occurrence["id"].as_str().unwrap().to_string();

    let (_, again) = send(
        &app,
        "POST",
        "/v1/occurrences",
        Some(json!({ "template_id": template_id, "travel_date": "2024-01-01" })),
    )
    .await;
    assert_eq!(again["id"].as_str().unwrap(), occurrence_id);

    // 13 bookable seats on a 14-seat vehicle.
    let seats_uri = format!("/v1/occurrences/{}/seats", occurrence_id);
    let (_, available) = send(&app, "GET", &seats_uri, None).await;
    assert_eq!(available["seats"].as_array().unwrap().len(), 13);

    // A paid batch of three: one booking and one payment per seat.
    let (status, bookings) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(booking_body(&occurrence_id, &[2, 3, 4], "PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bookings = bookings.as_array().unwrap().clone();
    assert_eq!(bookings.len(), 3);
    for booking in &bookings {
        assert_eq!(booking["amount"], 5000);
        assert_eq!(booking["status"], "CONFIRMED");
        assert_eq!(booking["payment_status"], "PAID");
        assert!(booking["reservation_code"]
            .as_str()
            .unwrap()
            .starts_with("VYR-"));
    }

    let (_, available) = send(&app, "GET", &seats_uri, None).await;
    assert_eq!(available["seats"].as_array().unwrap().len(), 10);

    // The dashboard feed reflects the recomputed counter.
    let (_, listed) = send(
        &app,
        "GET",
        &format!(
            "/v1/occurrences?from_date=2024-01-01&template_id={}",
            template_id
        ),
        None,
    )
    .await;
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["booked_seats"], 3);
    assert_eq!(rows[0]["seats_free"], 10);

    // Overlapping batch is rejected whole; seat 5 stays free.
    let (status, err) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(booking_body(&occurrence_id, &[4, 5], "PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains("4"));

    // Cancel all three; availability returns to the full seat set.
    for booking in &bookings {
        let uri = format!("/v1/bookings/{}/status", booking["id"].as_str().unwrap());
        let (status, updated) =
            send(&app, "PATCH", &uri, Some(json!({ "status": "CANCELLED" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["payment_status"], "CANCELLED");
    }

    let (_, available) = send(&app, "GET", &seats_uri, None).await;
    assert_eq!(available["seats"].as_array().unwrap().len(), 13);

    // Cancelling again is a no-op success.
    let uri = format!(
        "/v1/bookings/{}/status",
        bookings[0]["id"].as_str().unwrap()
    );
    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "CANCELLED" }))).await;
    assert_eq!(status, StatusCode::OK);

    // But reactivating a cancelled booking is not supported.
    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "CONFIRMED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let (app, seed) = test_app();

    let (_, template) = send(
        &app,
        "POST",
        "/v1/templates",
        Some(monday_template_body(&seed)),
    )
    .await;
    let template_id = template["id"].as_str().unwrap().to_string();
    let (_, occurrence) = send(
        &app,
        "POST",
        "/v1/occurrences",
        Some(json!({ "template_id": template_id, "travel_date": "2024-01-01" })),
    )
    .await;
    let occurrence_id = occurrence["id"].as_str().unwrap().to_string();

    // The driver position is never bookable.
    let (status, err) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(booking_body(&occurrence_id, &[1], "PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("driver"));

    // Empty batches are rejected before any write.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(booking_body(&occurrence_id, &[], "PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown occurrence is a 404.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/bookings",
        Some(booking_body(&Uuid::new_v4().to_string(), &[2], "PAID")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
