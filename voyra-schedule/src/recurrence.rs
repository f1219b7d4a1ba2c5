use chrono::{Datelike, Days, Months, NaiveDate};

use crate::template::{DayOfWeek, RecurrenceKind, TripTemplate};

/// Derive the end of a template's validity window from its recurrence kind.
///
/// Single-day templates are valid for exactly their start date; weekly ones
/// for one week; monthly and yearly ones for one month/year minus a day.
/// Month arithmetic clamps to the end of the target month, so a Jan 31 start
/// yields a window ending Feb 27 (28 in leap years).
pub fn compute_end_date(kind: RecurrenceKind, start: NaiveDate) -> NaiveDate {
    match kind {
        RecurrenceKind::SingleDay => start,
        RecurrenceKind::Weekly => start + Days::new(6),
        RecurrenceKind::Monthly => start + Months::new(1) - Days::new(1),
        RecurrenceKind::Yearly => start + Months::new(12) - Days::new(1),
    }
}

/// Does this template produce a departure on `date`?
///
/// Pure predicate: usable both to validate a requested booking date and to
/// enumerate upcoming dates for display. A weekly template with an empty
/// day-set never matches any date.
pub fn occurs_on(template: &TripTemplate, date: NaiveDate) -> bool {
    if date < template.start_date || date > template.end_date {
        return false;
    }
    match template.recurrence {
        RecurrenceKind::SingleDay => date == template.start_date,
        RecurrenceKind::Weekly => template.weekly_days.contains(&DayOfWeek::of(date)),
        RecurrenceKind::Monthly => date.day() == template.start_date.day(),
        RecurrenceKind::Yearly => {
            date.day() == template.start_date.day()
                && date.month() == template.start_date.month()
        }
    }
}

/// Enumerate the template's departure dates from `from` onwards, capped at
/// `limit` entries. Used by dashboards to render a template's bookable dates.
pub fn upcoming_dates(template: &TripTemplate, from: NaiveDate, limit: usize) -> Vec<NaiveDate> {
    if limit == 0 || from > template.end_date {
        return Vec::new();
    }
    let mut date = from.max(template.start_date);
    let mut dates = Vec::new();
    while date <= template.end_date && dates.len() < limit {
        if occurs_on(template, date) {
            dates.push(date);
        }
        date = date + Days::new(1);
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{NewTripTemplate, TemplateStatus, TripTemplate};
    use chrono::NaiveTime;
    use uuid::Uuid;

    fn template(
        recurrence: RecurrenceKind,
        days: &[DayOfWeek],
        start: NaiveDate,
    ) -> TripTemplate {
        TripTemplate::create(NewTripTemplate {
            pickup_city_id: Uuid::new_v4(),
            dropoff_city_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            vehicle_type_id: Uuid::new_v4(),
            seat_capacity: 14,
            time_slot_id: Uuid::new_v4(),
            departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            price_amount: 5000,
            currency: "TZS".to_string(),
            recurrence,
            weekly_days: days.iter().copied().collect(),
            start_date: start,
        })
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_date_formula_per_kind() {
        let cases = [
            (RecurrenceKind::SingleDay, date(2024, 3, 15), date(2024, 3, 15)),
            (RecurrenceKind::Weekly, date(2024, 3, 15), date(2024, 3, 21)),
            (RecurrenceKind::Monthly, date(2024, 3, 15), date(2024, 4, 14)),
            (RecurrenceKind::Yearly, date(2024, 3, 15), date(2025, 3, 14)),
            // Month-end clamping: Jan 31 + 1 month lands on Feb 29 (leap year).
            (RecurrenceKind::Monthly, date(2024, 1, 31), date(2024, 2, 28)),
            (RecurrenceKind::Monthly, date(2023, 1, 31), date(2023, 2, 27)),
        ];
        for (kind, start, expected) in cases {
            assert_eq!(compute_end_date(kind, start), expected, "{kind:?} {start}");
        }
    }

    #[test]
    fn test_single_day_occurs_only_on_start() {
        let t = template(RecurrenceKind::SingleDay, &[], date(2024, 3, 15));
        assert!(occurs_on(&t, date(2024, 3, 15)));
        assert!(!occurs_on(&t, date(2024, 3, 16)));
        assert!(!occurs_on(&t, date(2024, 3, 14)));
    }

    #[test]
    fn test_weekly_matches_day_set_within_window() {
        // 2024-01-01 is a Monday.
        let t = template(
            RecurrenceKind::Weekly,
            &[DayOfWeek::Monday, DayOfWeek::Thursday],
            date(2024, 1, 1),
        );
        assert!(occurs_on(&t, date(2024, 1, 1))); // Monday
        assert!(occurs_on(&t, date(2024, 1, 4))); // Thursday
        assert!(!occurs_on(&t, date(2024, 1, 3))); // Wednesday
        assert!(!occurs_on(&t, date(2024, 1, 8))); // Monday, past end_date
    }

    #[test]
    fn test_weekly_empty_day_set_never_occurs() {
        let t = template(RecurrenceKind::Weekly, &[], date(2024, 1, 1));
        for offset in 0..7u64 {
            assert!(!occurs_on(&t, date(2024, 1, 1) + Days::new(offset)));
        }
    }

    #[test]
    fn test_monthly_degenerates_to_start_date() {
        let t = template(RecurrenceKind::Monthly, &[], date(2024, 3, 15));
        assert!(occurs_on(&t, date(2024, 3, 15)));
        // The only other day-of-month match would be Apr 15, which lies just
        // outside the one-month-minus-a-day window.
        assert!(!occurs_on(&t, date(2024, 4, 15)));
        assert!(!occurs_on(&t, date(2024, 3, 16)));
    }

    #[test]
    fn test_yearly_degenerates_to_start_date() {
        let t = template(RecurrenceKind::Yearly, &[], date(2024, 3, 15));
        assert!(occurs_on(&t, date(2024, 3, 15)));
        assert!(!occurs_on(&t, date(2025, 3, 15)));
    }

    #[test]
    fn test_occurs_on_respects_template_window() {
        let t = template(RecurrenceKind::Weekly, &[DayOfWeek::Monday], date(2024, 1, 1));
        assert!(!occurs_on(&t, date(2023, 12, 25)));
        assert!(!occurs_on(&t, date(2024, 2, 5)));
    }

    #[test]
    fn test_upcoming_dates_enumeration() {
        let t = template(
            RecurrenceKind::Weekly,
            &[DayOfWeek::Monday, DayOfWeek::Friday],
            date(2024, 1, 1),
        );
        let dates = upcoming_dates(&t, date(2024, 1, 1), 10);
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 5)]);

        let limited = upcoming_dates(&t, date(2024, 1, 1), 1);
        assert_eq!(limited, vec![date(2024, 1, 1)]);

        assert!(upcoming_dates(&t, date(2024, 2, 1), 10).is_empty());
    }

    #[test]
    fn test_inactive_template_still_pure_predicate() {
        // occurs_on is a pure date predicate; lifecycle checks live with the
        // occurrence materialization, not here.
        let mut t = template(RecurrenceKind::SingleDay, &[], date(2024, 3, 15));
        t.status = TemplateStatus::Inactive;
        assert!(occurs_on(&t, date(2024, 3, 15)));
    }
}
