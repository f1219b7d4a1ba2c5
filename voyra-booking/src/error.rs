use voyra_schedule::TemplateError;

/// Error taxonomy of the booking engine.
///
/// Every failure leaves storage in its pre-call state; callers can rely on
/// the variant to decide between correcting input (`Validation`,
/// `SeatUnavailable`), retrying (`ConcurrencyConflict`, `StorageUnavailable`)
/// and giving up (`CodeGenerationFailed`, `Internal`).
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Seat(s) already taken: {seats:?}")]
    SeatUnavailable { seats: Vec<u32> },

    #[error("Could not allocate a unique reservation code after {attempts} attempts")]
    CodeGenerationFailed { attempts: u32 },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Concurrent update detected: {0}")]
    ConcurrencyConflict(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TemplateError> for BookingError {
    fn from(err: TemplateError) -> Self {
        BookingError::Validation(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
