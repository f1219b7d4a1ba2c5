pub mod reference;
pub mod seat_layout;

pub use reference::{City, TimeSlot, Vehicle, VehicleType};
pub use seat_layout::{SeatLayout, SeatRole};
