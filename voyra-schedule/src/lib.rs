pub mod recurrence;
pub mod template;

pub use recurrence::{compute_end_date, occurs_on, upcoming_dates};
pub use template::{
    DayOfWeek, NewTripTemplate, RecurrenceKind, TemplateError, TemplateStatus, TripTemplate,
};
