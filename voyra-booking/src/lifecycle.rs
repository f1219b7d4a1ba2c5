use crate::error::{BookingError, BookingResult};
use crate::models::{BookingStatus, PaymentStatus};

/// Outcome of a requested status transition.
///
/// `changed` is false for the idempotent no-op case (cancelling an already
/// cancelled booking); callers skip the write but still report success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub changed: bool,
}

/// The booking state machine as an explicit transition table.
///
/// Couplings enforced here rather than scattered through handlers:
/// confirmation implies payment receipt, cancellation cancels the payment
/// and frees the seat. Transitions out of `Cancelled` are not supported;
/// a new booking must be made instead.
pub fn plan_transition(
    current_status: BookingStatus,
    current_payment: PaymentStatus,
    target: BookingStatus,
) -> BookingResult<TransitionPlan> {
    if current_status == BookingStatus::Cancelled {
        if target == BookingStatus::Cancelled {
            // Idempotent: cancelling twice is the same as cancelling once.
            return Ok(TransitionPlan {
                status: BookingStatus::Cancelled,
                payment_status: PaymentStatus::Cancelled,
                changed: false,
            });
        }
        return Err(BookingError::InvalidTransition {
            from: current_status.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }

    let payment_status = match target {
        BookingStatus::Confirmed => PaymentStatus::Paid,
        BookingStatus::Cancelled => PaymentStatus::Cancelled,
        BookingStatus::Pending | BookingStatus::Boarded => current_payment,
    };

    Ok(TransitionPlan {
        status: target,
        payment_status,
        changed: target != current_status || payment_status != current_payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_forces_paid() {
        let plan = plan_transition(
            BookingStatus::Pending,
            PaymentStatus::Pending,
            BookingStatus::Confirmed,
        )
        .unwrap();
        assert_eq!(plan.status, BookingStatus::Confirmed);
        assert_eq!(plan.payment_status, PaymentStatus::Paid);
        assert!(plan.changed);
    }

    #[test]
    fn test_cancellation_cancels_payment() {
        let plan = plan_transition(
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
            BookingStatus::Cancelled,
        )
        .unwrap();
        assert_eq!(plan.payment_status, PaymentStatus::Cancelled);
        assert!(plan.changed);
    }

    #[test]
    fn test_cancelling_cancelled_is_noop_success() {
        let plan = plan_transition(
            BookingStatus::Cancelled,
            PaymentStatus::Cancelled,
            BookingStatus::Cancelled,
        )
        .unwrap();
        assert!(!plan.changed);
        assert_eq!(plan.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_no_way_back_from_cancelled() {
        for target in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Boarded,
        ] {
            let result = plan_transition(
                BookingStatus::Cancelled,
                PaymentStatus::Cancelled,
                target,
            );
            assert!(
                matches!(result, Err(BookingError::InvalidTransition { .. })),
                "{target:?}"
            );
        }
    }

    #[test]
    fn test_boarding_keeps_payment_status() {
        let plan = plan_transition(
            BookingStatus::Confirmed,
            PaymentStatus::Paid,
            BookingStatus::Boarded,
        )
        .unwrap();
        assert_eq!(plan.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_same_status_without_payment_change_is_unchanged() {
        let plan = plan_transition(
            BookingStatus::Pending,
            PaymentStatus::Pending,
            BookingStatus::Pending,
        )
        .unwrap();
        assert!(!plan.changed);
    }
}
