use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role of a single seat position in a vehicle plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatRole {
    Driver,
    Passenger,
}

/// Physical seat plan for one vehicle capacity.
///
/// Seats are numbered from 1, following the order of `roles`. The driver
/// position is part of the plan but never bookable.
#[derive(Debug, Clone)]
pub struct SeatLayout {
    capacity: u32,
    roles: Vec<SeatRole>,
}

impl SeatLayout {
    /// Look up the plan for a vehicle capacity.
    ///
    /// Known capacities get their curated plan; anything else falls back to
    /// the default plan (driver in seat 1, passengers behind). The fallback
    /// is intentional so an unusual vehicle class still sells seats.
    pub fn for_capacity(capacity: u32) -> Self {
        match capacity {
            // Vans and minibuses number the cab first.
            7 | 10 | 14 => Self::with_driver_at(capacity, 1),
            // Coaster charts number the saloon 1..18 and park the driver last.
            19 => Self::with_driver_at(19, 19),
            other => Self::with_driver_at(other, 1),
        }
    }

    fn with_driver_at(capacity: u32, driver_seat: u32) -> Self {
        let roles = (1..=capacity)
            .map(|seat| {
                if seat == driver_seat {
                    SeatRole::Driver
                } else {
                    SeatRole::Passenger
                }
            })
            .collect();
        Self { capacity, roles }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Role of the given 1-based seat number, if the seat exists.
    pub fn role_of(&self, seat: u32) -> Option<SeatRole> {
        if seat == 0 {
            return None;
        }
        self.roles.get((seat - 1) as usize).copied()
    }

    pub fn is_bookable(&self, seat: u32) -> bool {
        self.role_of(seat) == Some(SeatRole::Passenger)
    }

    /// All seat numbers a passenger may occupy, in order.
    pub fn bookable_seats(&self) -> BTreeSet<u32> {
        (1..=self.capacity)
            .filter(|&seat| self.is_bookable(seat))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_seat_is_not_bookable() {
        let layout = SeatLayout::for_capacity(14);
        assert_eq!(layout.role_of(1), Some(SeatRole::Driver));
        assert!(!layout.is_bookable(1));
        assert!(layout.is_bookable(2));
        assert!(layout.is_bookable(14));
    }

    #[test]
    fn test_bookable_count_excludes_driver() {
        for capacity in [7u32, 10, 14, 19] {
            let layout = SeatLayout::for_capacity(capacity);
            assert_eq!(layout.bookable_seats().len() as u32, capacity - 1);
        }
    }

    #[test]
    fn test_out_of_range_seats() {
        let layout = SeatLayout::for_capacity(14);
        assert_eq!(layout.role_of(0), None);
        assert_eq!(layout.role_of(15), None);
        assert!(!layout.is_bookable(0));
        assert!(!layout.is_bookable(15));
    }

    #[test]
    fn test_coaster_plan_parks_driver_last() {
        let layout = SeatLayout::for_capacity(19);
        assert_eq!(layout.role_of(19), Some(SeatRole::Driver));
        assert!(layout.is_bookable(1));
        assert!(layout.is_bookable(18));
        assert!(!layout.is_bookable(19));
    }

    #[test]
    fn test_unknown_capacity_falls_back_to_default_plan() {
        let layout = SeatLayout::for_capacity(11);
        assert_eq!(layout.capacity(), 11);
        assert_eq!(layout.role_of(1), Some(SeatRole::Driver));
        assert_eq!(layout.bookable_seats().len(), 10);
    }
}
