//! Billing tracking formatting

use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::models::{Money, PaymentStatus, TrackingInfo};

#[derive(Tabled)]
struct TrackingRow {
    #[tabled(rename = "Student")]
    student: String,
    #[tabled(rename = "Course")]
    course: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Periods")]
    periods: u32,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Pending")]
    pending: String,
    #[tabled(rename = "Status")]
    status: PaymentStatus,
    #[tabled(rename = "Last payment")]
    last_payment: String,
}

/// Format reconciled enrollments as a table with a totals line
pub fn format_tracking_table(tracking: &[TrackingInfo], currency: &str) -> String {
    if tracking.is_empty() {
        return "No active enrollments.".to_string();
    }

    let rows = tracking.iter().map(|t| TrackingRow {
        student: if t.student_name.is_empty() {
            t.student_id.clone()
        } else {
            t.student_name.clone()
        },
        course: t.course_title.clone(),
        price: format!("{}/{}", t.course_price.format_with_symbol(currency), t.price_unit),
        periods: t.periods_elapsed,
        expected: t.expected_to_date.format_with_symbol(currency),
        paid: t.paid_total.format_with_symbol(currency),
        pending: t.pending_amount.format_with_symbol(currency),
        status: t.status,
        last_payment: t
            .last_payment_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string()),
    });

    let mut output = Table::new(rows)
        .with(Style::psql())
        .with(Modify::new(Columns::new(2..7)).with(Alignment::right()))
        .to_string();
    output.push('\n');

    let expected: Money = tracking.iter().map(|t| t.expected_to_date).sum();
    let paid: Money = tracking.iter().map(|t| t.paid_total).sum();
    let pending: Money = tracking.iter().map(|t| t.pending_amount).sum();
    let count = |status: PaymentStatus| tracking.iter().filter(|t| t.status == status).count();

    output.push_str(&format!(
        "\nExpected: {}  Paid: {}  Pending: {}\n",
        expected.format_with_symbol(currency),
        paid.format_with_symbol(currency),
        pending.format_with_symbol(currency),
    ));
    output.push_str(&format!(
        "{} paid, {} partial, {} pending\n",
        count(PaymentStatus::Paid),
        count(PaymentStatus::Partial),
        count(PaymentStatus::Pending),
    ));

    output
}
