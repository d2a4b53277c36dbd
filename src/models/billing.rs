//! Billing cadence and reconciliation output types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::fold_accents;
use super::money::{self, Money};

/// Billing cadence of a course price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceUnit {
    /// Charged per class session
    Session,
    Month,
    Trimester,
    Year,
    /// Whole price owed once, up front
    Full,
}

impl PriceUnit {
    pub const ALL: [PriceUnit; 5] = [
        PriceUnit::Session,
        PriceUnit::Month,
        PriceUnit::Trimester,
        PriceUnit::Year,
        PriceUnit::Full,
    ];

    /// Canonical label as stored on a course
    pub fn as_str(self) -> &'static str {
        match self {
            PriceUnit::Session => "SESSION",
            PriceUnit::Month => "MONTH",
            PriceUnit::Trimester => "TRIMESTER",
            PriceUnit::Year => "YEAR",
            PriceUnit::Full => "FULL",
        }
    }

    /// Parse a canonical label or one of its English/Spanish synonyms
    ///
    /// # Examples
    /// ```
    /// use academy_cli::models::PriceUnit;
    /// assert_eq!(PriceUnit::parse_label("mes"), Some(PriceUnit::Month));
    /// assert_eq!(PriceUnit::parse_label("Año"), Some(PriceUnit::Year));
    /// assert_eq!(PriceUnit::parse_label("weekly"), None);
    /// ```
    pub fn parse_label(label: &str) -> Option<PriceUnit> {
        let folded = fold_accents(label.trim()).to_uppercase().replace([' ', '-'], "_");
        let unit = match folded.as_str() {
            "SESSION" | "SESION" | "CLASE" | "CLASS" | "POR_CLASE" | "POR_SESION" => {
                PriceUnit::Session
            }
            "MONTH" | "MONTHLY" | "MES" | "MENSUAL" => PriceUnit::Month,
            "TRIMESTER" | "QUARTER" | "QUARTERLY" | "TRIMESTRE" | "TRIMESTRAL" => {
                PriceUnit::Trimester
            }
            "YEAR" | "YEARLY" | "ANNUAL" | "ANO" | "ANUAL" => PriceUnit::Year,
            "FULL" | "TOTAL" | "UNICO" | "PAGO_UNICO" | "ONCE" => PriceUnit::Full,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciled state of an enrollment's billing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing outstanding and at least one payment recorded
    Paid,
    /// Some money received, less than what is due
    Partial,
    /// Nothing received yet
    Pending,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Pending => "PENDING",
        };
        write!(f, "{}", label)
    }
}

/// Billing view of one active enrollment, derived on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub enrollment_id: String,
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,
    pub course_title: String,
    #[serde(with = "money::as_decimal")]
    pub course_price: Money,
    pub price_unit: PriceUnit,
    /// Completed billing periods counted toward `expected_to_date`
    pub periods_elapsed: u32,
    #[serde(with = "money::as_decimal")]
    pub paid_total: Money,
    #[serde(with = "money::as_decimal")]
    pub expected_to_date: Money,
    #[serde(with = "money::as_decimal")]
    pub pending_amount: Money,
    pub status: PaymentStatus,
    pub last_payment_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_unit_synonyms() {
        assert_eq!(PriceUnit::parse_label("MONTH"), Some(PriceUnit::Month));
        assert_eq!(PriceUnit::parse_label("trimestre"), Some(PriceUnit::Trimester));
        assert_eq!(PriceUnit::parse_label("AÑO"), Some(PriceUnit::Year));
        assert_eq!(PriceUnit::parse_label("anual"), Some(PriceUnit::Year));
        assert_eq!(PriceUnit::parse_label("Sesión"), Some(PriceUnit::Session));
        assert_eq!(PriceUnit::parse_label("clase"), Some(PriceUnit::Session));
        assert_eq!(PriceUnit::parse_label("Único"), Some(PriceUnit::Full));
        assert_eq!(PriceUnit::parse_label(""), None);
    }

    #[test]
    fn test_canonical_labels_round_trip() {
        for unit in PriceUnit::ALL {
            assert_eq!(PriceUnit::parse_label(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn test_tracking_info_serializes_decimal_amounts() {
        let info = TrackingInfo {
            enrollment_id: "MAT001".into(),
            student_id: "EST001".into(),
            student_name: "Ana".into(),
            course_id: "CURSO001".into(),
            course_title: "Inglés B1".into(),
            course_price: Money::from_units(300),
            price_unit: PriceUnit::Month,
            periods_elapsed: 2,
            paid_total: Money::from_units(300),
            expected_to_date: Money::from_units(600),
            pending_amount: Money::from_units(300),
            status: PaymentStatus::Partial,
            last_payment_date: NaiveDate::from_ymd_opt(2024, 2, 1),
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["pendingAmount"], serde_json::json!(300.0));
        assert_eq!(json["priceUnit"], "MONTH");
        assert_eq!(json["status"], "PARTIAL");
        assert_eq!(json["lastPaymentDate"], "2024-02-01");
    }
}
