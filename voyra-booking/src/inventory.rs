use std::collections::BTreeSet;
use voyra_catalog::SeatLayout;

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus, PaymentStatus};

/// Check a requested seat batch against the vehicle's seat plan.
///
/// Rejects empty batches, seats outside the plan and the driver position.
/// Runs before any storage write.
pub fn validate_seat_selection(layout: &SeatLayout, seats: &BTreeSet<u32>) -> BookingResult<()> {
    if seats.is_empty() {
        return Err(BookingError::Validation(
            "At least one seat must be requested".to_string(),
        ));
    }
    for &seat in seats {
        match layout.role_of(seat) {
            None => {
                return Err(BookingError::Validation(format!(
                    "Seat {} does not exist on a {}-seat vehicle",
                    seat,
                    layout.capacity()
                )))
            }
            Some(voyra_catalog::SeatRole::Driver) => {
                return Err(BookingError::Validation(format!(
                    "Seat {} is the driver position and cannot be booked",
                    seat
                )))
            }
            Some(voyra_catalog::SeatRole::Passenger) => {}
        }
    }
    Ok(())
}

/// A booking holds its seat unless both sides of the cancellation coupling
/// have released it.
pub fn holds_seat(booking: &Booking) -> bool {
    booking.status != BookingStatus::Cancelled
        && booking.payment_status != PaymentStatus::Cancelled
}

/// Whether a booking counts toward the occurrence's booked-seat tally.
pub fn counts_toward_load(booking: &Booking) -> bool {
    matches!(
        booking.status,
        BookingStatus::Confirmed | BookingStatus::Boarded
    )
}

/// Seats currently held on an occurrence.
pub fn held_seats<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> BTreeSet<u32> {
    bookings
        .into_iter()
        .filter(|b| holds_seat(b))
        .map(|b| b.seat_number)
        .collect()
}

/// Requested seats that collide with already-held ones, for error reporting.
pub fn seat_conflicts(requested: &BTreeSet<u32>, held: &BTreeSet<u32>) -> Vec<u32> {
    requested.intersection(held).copied().collect()
}

/// The denormalized occurrence counter, recomputed from booking rows.
pub fn booked_seat_count<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> u32 {
    bookings.into_iter().filter(|b| counts_toward_load(b)).count() as u32
}

/// Bookable seats minus held seats.
pub fn available_seats<'a>(
    layout: &SeatLayout,
    bookings: impl IntoIterator<Item = &'a Booking>,
) -> BTreeSet<u32> {
    let held = held_seats(bookings);
    layout
        .bookable_seats()
        .into_iter()
        .filter(|seat| !held.contains(seat))
        .collect()
}
