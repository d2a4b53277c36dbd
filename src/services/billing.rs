//! Billing reconciliation
//!
//! For every active enrollment, compares what the course's billing plan
//! says should have been paid by a given day with the payments actually
//! recorded for the same student and course.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, warn};

use crate::config::BillingSettings;
use crate::error::AcademyResult;
use crate::models::{EntityKind, Money, PaymentStatus, PriceUnit, Record, TrackingInfo};
use crate::storage::EntityStore;

/// Enrollment statuses that take part in reconciliation
pub const ACTIVE_ENROLLMENT_STATUSES: [&str; 2] = ["ENROLLED", "IN_PROGRESS"];

/// Only payments in this status count toward the paid total
pub const SETTLED_PAYMENT_STATUS: &str = "PAID";

/// Service for the outstanding-balance view
pub struct BillingService<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    settings: &'a BillingSettings,
}

impl<'a, S: EntityStore + ?Sized> BillingService<'a, S> {
    pub fn new(store: &'a S, settings: &'a BillingSettings) -> Self {
        Self { store, settings }
    }

    /// Reconcile every active enrollment as of `today`
    pub fn track_payments(&self, today: NaiveDate) -> AcademyResult<Vec<TrackingInfo>> {
        let enrollments = self.store.list_all(EntityKind::Enrollments)?;
        let courses = index_by_id(self.store.list_all(EntityKind::Courses)?);
        let students = index_by_id(self.store.list_all(EntityKind::Students)?);
        let payments: Vec<Record> = self
            .store
            .list_all(EntityKind::Payments)?
            .into_iter()
            .filter(|p| p.text_is_any("status", &[SETTLED_PAYMENT_STATUS]))
            .collect();

        let mut tracking = Vec::new();
        for enrollment in &enrollments {
            if !enrollment.text_is_any("status", &ACTIVE_ENROLLMENT_STATUSES) {
                continue;
            }
            let (Some(student_id), Some(course_id)) =
                (enrollment.text("studentId"), enrollment.text("courseId"))
            else {
                debug!(enrollment = enrollment.id(), "enrollment without student or course");
                continue;
            };
            let Some(course) = courses.get(course_id.as_str()) else {
                warn!(enrollment = enrollment.id(), course = %course_id, "enrolled course not found");
                continue;
            };

            let student_name = students
                .get(student_id.as_str())
                .and_then(|s| s.text("name"))
                .unwrap_or_default();
            let matching: Vec<&Record> = payments
                .iter()
                .filter(|p| {
                    p.text("studentId").as_deref() == Some(student_id.as_str())
                        && p.text("courseId").as_deref() == Some(course_id.as_str())
                })
                .collect();

            tracking.push(self.reconcile(
                enrollment,
                course,
                student_id,
                student_name,
                &matching,
                today,
            ));
        }

        Ok(tracking)
    }

    /// Billing view of one enrollment
    pub fn reconcile(
        &self,
        enrollment: &Record,
        course: &Record,
        student_id: String,
        student_name: String,
        payments: &[&Record],
        today: NaiveDate,
    ) -> TrackingInfo {
        let price = Money::from_decimal(
            course
                .number("price")
                .or_else(|| course.number("amount"))
                .unwrap_or(0.0),
        );
        let unit = match course.text("priceUnit") {
            None => self.settings.default_price_unit,
            Some(label) => PriceUnit::parse_label(&label).unwrap_or(PriceUnit::Full),
        };

        let enrolled_on = enrollment.date("enrollmentDate");
        let start = course
            .date("startDate")
            .or(enrolled_on)
            .or_else(|| enrollment.date("createdAt"));
        let end = course.date("endDate");

        let (periods_elapsed, expected_to_date) = match unit {
            PriceUnit::Full => {
                let known: Vec<NaiveDate> = [enrolled_on, start].into_iter().flatten().collect();
                let begun = known.is_empty() || known.iter().any(|d| *d <= today);
                if begun {
                    (1, price)
                } else {
                    (0, Money::zero())
                }
            }
            cadence => {
                let periods = start
                    .map(|start| periods_elapsed(self.settings, cadence, start, end, today))
                    .unwrap_or(0);
                (periods, price * periods)
            }
        };

        let paid_total: Money = payments
            .iter()
            .map(|p| {
                Money::from_decimal(p.number("amount").or_else(|| p.number("price")).unwrap_or(0.0))
            })
            .sum();
        let last_payment_date = payments
            .iter()
            .filter_map(|p| p.date("paymentDate").or_else(|| p.date("paidDate")))
            .max();

        let pending_amount = (expected_to_date - paid_total).clamp_non_negative();
        let status = payment_status(paid_total, expected_to_date, pending_amount);

        TrackingInfo {
            enrollment_id: enrollment.id().to_string(),
            student_id,
            student_name,
            course_id: course.id().to_string(),
            course_title: course
                .text("title")
                .or_else(|| course.text("name"))
                .unwrap_or_default(),
            course_price: price,
            price_unit: unit,
            periods_elapsed,
            paid_total,
            expected_to_date,
            pending_amount,
            status,
            last_payment_date,
        }
    }
}

/// PAID when nothing is outstanding and something was paid, PARTIAL when
/// some but not all of the expected amount arrived, PENDING otherwise
pub fn payment_status(paid: Money, expected: Money, pending: Money) -> PaymentStatus {
    if pending.is_zero() && paid.is_positive() {
        PaymentStatus::Paid
    } else if paid.is_positive() && paid < expected {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

/// Completed billing periods between `start` and `today`
///
/// Month-based cadences count calendar months (a month completes on the
/// same day-of-month); sessions count fixed-length blocks of days. When the
/// course has an end date the count never exceeds the number of periods the
/// course spans, rounding a trailing partial period up.
pub fn periods_elapsed(
    settings: &BillingSettings,
    unit: PriceUnit,
    start: NaiveDate,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> u32 {
    let elapsed = match unit {
        PriceUnit::Full => return 1,
        PriceUnit::Session => {
            let length = settings.session_days.max(1);
            days_between(start, today) / length
        }
        month_based => {
            let per_period = months_per_period(settings, month_based);
            completed_months(start, today) / per_period
        }
    };

    match end {
        Some(end) => elapsed.min(total_periods(settings, unit, start, end)),
        None => elapsed,
    }
}

/// Periods a course running from `start` to `end` spans, partial ones included
fn total_periods(settings: &BillingSettings, unit: PriceUnit, start: NaiveDate, end: NaiveDate) -> u32 {
    match unit {
        PriceUnit::Full => 1,
        PriceUnit::Session => {
            let length = settings.session_days.max(1);
            let days = days_between(start, end);
            days / length + u32::from(days % length != 0)
        }
        month_based => {
            let per_period = months_per_period(settings, month_based);
            let months = completed_months(start, end);
            let has_remainder = add_months(start, months).map_or(false, |d| d < end);
            months / per_period + u32::from(months % per_period != 0 || has_remainder)
        }
    }
}

fn months_per_period(settings: &BillingSettings, unit: PriceUnit) -> u32 {
    let months = match unit {
        PriceUnit::Trimester => settings.trimester_months,
        PriceUnit::Year => settings.year_months,
        _ => settings.month_months,
    };
    months.max(1)
}

/// Whole days from `from` to `to`, zero when `to` is earlier
fn days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    u32::try_from((to - from).num_days()).unwrap_or(0)
}

/// Whole calendar months from `from` to `to`, zero when `to` is earlier
pub fn completed_months(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    u32::try_from(months).unwrap_or(0)
}

fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

fn index_by_id(records: Vec<Record>) -> HashMap<String, Record> {
    records
        .into_iter()
        .map(|r| (r.id().to_string(), r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcademyPaths;
    use crate::models::{FieldValue, NormalizedPayload};
    use crate::storage::Storage;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn reference(s: &str) -> FieldValue {
        FieldValue::Reference(s.to_string())
    }

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = AcademyPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::open(paths).unwrap();
        (temp_dir, storage)
    }

    /// One student enrolled in a 300/month course starting 2024-01-15
    fn setup_enrollment(storage: &Storage, unit: Option<&str>) {
        storage
            .upsert(
                EntityKind::Students,
                &NormalizedPayload::new()
                    .with("id", text("EST001"))
                    .with("name", text("Ana García")),
            )
            .unwrap();

        let mut course = NormalizedPayload::new()
            .with("id", text("CURSO001"))
            .with("title", text("Inglés B1"))
            .with("price", FieldValue::Number(300.0))
            .with("startDate", FieldValue::Date(date(2024, 1, 15)));
        if let Some(unit) = unit {
            course.set("priceUnit", text(unit));
        }
        storage.upsert(EntityKind::Courses, &course).unwrap();

        storage
            .upsert(
                EntityKind::Enrollments,
                &NormalizedPayload::new()
                    .with("id", text("MAT001"))
                    .with("studentId", reference("EST001"))
                    .with("courseId", reference("CURSO001"))
                    .with("status", text("ENROLLED"))
                    .with("enrollmentDate", FieldValue::Date(date(2024, 1, 10))),
            )
            .unwrap();
    }

    fn add_payment(storage: &Storage, id: &str, amount: f64, status: &str, paid_on: NaiveDate) {
        storage
            .upsert(
                EntityKind::Payments,
                &NormalizedPayload::new()
                    .with("id", text(id))
                    .with("studentId", reference("EST001"))
                    .with("courseId", reference("CURSO001"))
                    .with("amount", FieldValue::Number(amount))
                    .with("status", text(status))
                    .with("paymentDate", FieldValue::Date(paid_on)),
            )
            .unwrap();
    }

    #[test]
    fn test_monthly_course_partially_paid() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        add_payment(&storage, "PAG001", 300.0, "PAID", date(2024, 1, 15));

        let settings = BillingSettings::default();
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 3, 15))
            .unwrap();

        assert_eq!(tracking.len(), 1);
        let info = &tracking[0];
        assert_eq!(info.student_name, "Ana García");
        assert_eq!(info.course_title, "Inglés B1");
        assert_eq!(info.periods_elapsed, 2);
        assert_eq!(info.expected_to_date, Money::from_units(600));
        assert_eq!(info.paid_total, Money::from_units(300));
        assert_eq!(info.pending_amount, Money::from_units(300));
        assert_eq!(info.status, PaymentStatus::Partial);
        assert_eq!(info.last_payment_date, Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_monthly_course_fully_paid() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        add_payment(&storage, "PAG001", 300.0, "PAID", date(2024, 1, 15));
        add_payment(&storage, "PAG002", 300.0, "PAID", date(2024, 2, 15));

        let settings = BillingSettings::default();
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 3, 15))
            .unwrap();

        let info = &tracking[0];
        assert_eq!(info.pending_amount, Money::zero());
        assert_eq!(info.status, PaymentStatus::Paid);
        assert_eq!(info.last_payment_date, Some(date(2024, 2, 15)));
    }

    #[test]
    fn test_only_paid_payments_count() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        add_payment(&storage, "PAG001", 300.0, "PENDING", date(2024, 1, 15));
        add_payment(&storage, "PAG002", 300.0, "REFUNDED", date(2024, 2, 15));

        let settings = BillingSettings::default();
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 3, 15))
            .unwrap();

        assert_eq!(tracking[0].paid_total, Money::zero());
        assert_eq!(tracking[0].status, PaymentStatus::Pending);
        assert_eq!(tracking[0].last_payment_date, None);
    }

    #[test]
    fn test_huge_stored_price_saturates_instead_of_overflowing() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        storage
            .upsert(
                EntityKind::Courses,
                &NormalizedPayload::new()
                    .with("id", text("CURSO001"))
                    .with("price", FieldValue::Number(1e17))
                    .with("startDate", FieldValue::Date(date(2024, 1, 1))),
            )
            .unwrap();
        add_payment(&storage, "PAG001", 300.0, "PAID", date(2024, 1, 15));

        let settings = BillingSettings::default();
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 3, 1))
            .unwrap();

        let info = &tracking[0];
        assert_eq!(info.periods_elapsed, 2);
        assert_eq!(info.expected_to_date.cents(), i64::MAX);
        assert!(info.pending_amount.is_positive());
        assert_eq!(info.status, PaymentStatus::Partial);
    }

    #[test]
    fn test_missing_unit_defaults_to_month_and_unknown_to_full() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, None);
        let settings = BillingSettings::default();

        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 4, 20))
            .unwrap();
        assert_eq!(tracking[0].price_unit, PriceUnit::Month);
        assert_eq!(tracking[0].expected_to_date, Money::from_units(900));

        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("WEEKLY"));
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 4, 20))
            .unwrap();
        assert_eq!(tracking[0].price_unit, PriceUnit::Full);
        assert_eq!(tracking[0].expected_to_date, Money::from_units(300));
    }

    #[test]
    fn test_inactive_enrollments_are_skipped() {
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        storage
            .upsert(
                EntityKind::Enrollments,
                &NormalizedPayload::new()
                    .with("id", text("MAT001"))
                    .with("status", text("COMPLETED")),
            )
            .unwrap();

        let settings = BillingSettings::default();
        let tracking = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 3, 15))
            .unwrap();
        assert!(tracking.is_empty());
    }

    #[test]
    fn test_full_price_owed_once_started() {
        let settings = BillingSettings::default();
        assert_eq!(
            periods_elapsed(&settings, PriceUnit::Full, date(2024, 1, 1), None, date(2030, 1, 1)),
            1
        );

        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("FULL"));
        let before = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 1, 5))
            .unwrap();
        assert_eq!(before[0].expected_to_date, Money::zero());
        assert_eq!(before[0].status, PaymentStatus::Pending);

        let after = BillingService::new(&storage, &settings)
            .track_payments(date(2024, 1, 12))
            .unwrap();
        assert_eq!(after[0].expected_to_date, Money::from_units(300));
    }

    #[test]
    fn test_completed_months() {
        assert_eq!(completed_months(date(2024, 1, 15), date(2024, 3, 15)), 2);
        assert_eq!(completed_months(date(2024, 1, 15), date(2024, 3, 14)), 1);
        assert_eq!(completed_months(date(2024, 1, 31), date(2024, 2, 29)), 0);
        assert_eq!(completed_months(date(2024, 3, 1), date(2024, 1, 1)), 0);
        assert_eq!(completed_months(date(2023, 11, 1), date(2024, 2, 1)), 3);
    }

    #[test]
    fn test_period_cadences() {
        let settings = BillingSettings::default();
        let start = date(2024, 1, 1);

        assert_eq!(periods_elapsed(&settings, PriceUnit::Session, start, None, date(2024, 1, 22)), 3);
        assert_eq!(periods_elapsed(&settings, PriceUnit::Trimester, start, None, date(2024, 7, 15)), 2);
        assert_eq!(periods_elapsed(&settings, PriceUnit::Year, start, None, date(2025, 12, 31)), 1);
        assert_eq!(periods_elapsed(&settings, PriceUnit::Month, start, None, date(2023, 6, 1)), 0);
    }

    #[test]
    fn test_periods_capped_by_course_end() {
        let settings = BillingSettings::default();
        let start = date(2024, 1, 1);
        let end = Some(date(2024, 6, 15));

        // Jan 1 to Jun 15 spans 5 full months plus a partial sixth
        assert_eq!(periods_elapsed(&settings, PriceUnit::Month, start, end, date(2025, 1, 1)), 6);
        assert_eq!(periods_elapsed(&settings, PriceUnit::Trimester, start, end, date(2025, 1, 1)), 2);
        assert_eq!(periods_elapsed(&settings, PriceUnit::Month, start, end, date(2024, 3, 1)), 2);
    }

    #[test]
    fn test_expected_is_monotonic_and_pending_non_negative() {
        let settings = BillingSettings::default();
        let (_temp_dir, storage) = create_test_storage();
        setup_enrollment(&storage, Some("MONTH"));
        add_payment(&storage, "PAG001", 5000.0, "PAID", date(2024, 1, 15));
        let service = BillingService::new(&storage, &settings);

        let mut previous = Money::zero();
        let mut day = date(2023, 12, 1);
        while day < date(2025, 3, 1) {
            let info = service.track_payments(day).unwrap().remove(0);
            assert!(info.expected_to_date >= previous);
            assert!(!info.pending_amount.is_negative());
            previous = info.expected_to_date;
            day = day + chrono::Duration::days(9);
        }
    }

    #[test]
    fn test_payment_status_rules() {
        let m = Money::from_units;
        assert_eq!(payment_status(m(600), m(600), m(0)), PaymentStatus::Paid);
        assert_eq!(payment_status(m(900), m(600), m(0)), PaymentStatus::Paid);
        assert_eq!(payment_status(m(300), m(600), m(300)), PaymentStatus::Partial);
        assert_eq!(payment_status(m(0), m(600), m(600)), PaymentStatus::Pending);
        assert_eq!(payment_status(m(0), m(0), m(0)), PaymentStatus::Pending);
    }
}
