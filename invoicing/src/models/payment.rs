//! Payment model.

use super::{Page, RecordView};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment type. Cash payments are stored with a NULL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Payment,
    Credit,
}

impl PaymentType {
    pub fn as_db(&self) -> Option<&'static str> {
        match self {
            PaymentType::Payment => None,
            PaymentType::Credit => Some("credit"),
        }
    }
}

/// Payment recorded against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_amount: Decimal,
    pub payment_type: Option<String>,
    pub payment_method: Option<String>,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub paid_full: bool,
    pub credit_applied: Decimal,
    pub archive_number: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Payment {
    pub fn payment_type(&self) -> PaymentType {
        match self.payment_type.as_deref() {
            Some("credit") => PaymentType::Credit,
            _ => PaymentType::Payment,
        }
    }

    /// Credits never count toward the amount paid.
    pub fn is_credit(&self) -> bool {
        self.payment_type() == PaymentType::Credit
    }
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub invoice_id: Uuid,
    pub payment_amount: Decimal,
    pub payment_method: Option<String>,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub paid_full: bool,
}

/// Input for updating a payment. The amount cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct UpdatePayment {
    pub payment_method: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Filter parameters for listing payments.
#[derive(Debug, Clone, Default)]
pub struct ListPaymentsFilter {
    pub view: RecordView,
    pub invoice_id: Option<Uuid>,
    pub page: Page,
}
