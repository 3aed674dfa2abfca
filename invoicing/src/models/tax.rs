//! Tax model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named tax percentage applied to line items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tax {
    pub tax_id: Uuid,
    pub name: String,
    pub percentage: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl Tax {
    /// Label used to group tax amounts, e.g. `"GST 7.5%"`.
    pub fn label(&self) -> String {
        format!("{} {}%", self.name, self.percentage.normalize())
    }
}

/// Input for creating a tax.
#[derive(Debug, Clone)]
pub struct CreateTax {
    pub name: String,
    pub percentage: Decimal,
}
