//! Line item model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Line item on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub item_name: String,
    pub item_description: Option<String>,
    pub item_unit_cost: Decimal,
    pub item_quantity: Decimal,
    pub tax1_id: Option<Uuid>,
    pub tax2_id: Option<Uuid>,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.item_unit_cost * self.item_quantity
    }

    /// Copy as creation input, used when duplicating an invoice.
    pub fn to_create(&self) -> CreateLineItem {
        CreateLineItem {
            item_name: self.item_name.clone(),
            item_description: self.item_description.clone(),
            item_unit_cost: self.item_unit_cost,
            item_quantity: self.item_quantity,
            tax1_id: self.tax1_id,
            tax2_id: self.tax2_id,
        }
    }
}

/// Input for creating a line item.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateLineItem {
    pub item_name: String,
    pub item_description: Option<String>,
    pub item_unit_cost: Decimal,
    pub item_quantity: Decimal,
    pub tax1_id: Option<Uuid>,
    pub tax2_id: Option<Uuid>,
}

impl CreateLineItem {
    pub fn line_total(&self) -> Decimal {
        self.item_unit_cost * self.item_quantity
    }

    /// Rows without an item name are dropped on save.
    pub fn is_blank(&self) -> bool {
        self.item_name.trim().is_empty()
    }
}
