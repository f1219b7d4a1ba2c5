pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod repository;
pub mod reservation;

pub use error::{BookingError, BookingResult};
pub use manager::BookingManager;
pub use models::{
    BookSeatsRequest, Booking, BookingStatus, OccurrenceFilter, OccurrenceStatus,
    OccurrenceSummary, PassengerDetails, Payment, PaymentStatus, TripOccurrence,
};
pub use repository::{CatalogRepository, ScheduleStore, TemplateRepository};
pub use reservation::CodeGenerator;
