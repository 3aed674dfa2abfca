//! Invoice model.

use super::{CreateLineItem, LineItem, Page, RecordView};
use crate::status::{InvoiceStatus, StatusError, StatusFields};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice-level discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    /// Percentage of the sub total, e.g. `10` for 10%.
    Percentage(Decimal),
    /// Fixed amount taken off the sub total.
    Amount(Decimal),
}

impl Discount {
    /// Value stored in `invoices.discount_type`.
    pub fn type_str(&self) -> Option<&'static str> {
        match self {
            Discount::None => None,
            Discount::Percentage(_) => Some("percentage"),
            Discount::Amount(_) => Some("amount"),
        }
    }

    pub fn percentage(&self) -> Option<Decimal> {
        match self {
            Discount::Percentage(pct) => Some(*pct),
            _ => None,
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub client_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub po_number: Option<String>,
    pub discount_type: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub discount_amount: Decimal,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub invoice_total: Decimal,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub status: String,
    pub last_invoice_status: Option<String>,
    pub archive_number: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    /// Parsed status. Fails on values the state machine does not know.
    pub fn status(&self) -> Result<InvoiceStatus, StatusError> {
        self.status.parse()
    }

    /// Parsed status fields owned by the state machine.
    pub fn status_fields(&self) -> Result<StatusFields, StatusError> {
        Ok(StatusFields {
            status: self.status()?,
            last_invoice_status: self
                .last_invoice_status
                .as_deref()
                .map(str::parse::<InvoiceStatus>)
                .transpose()?,
        })
    }

    pub fn tooltip(&self) -> Result<&'static str, StatusError> {
        Ok(self.status()?.description())
    }

    pub fn discount(&self) -> Discount {
        match self.discount_type.as_deref() {
            Some("percentage") => {
                Discount::Percentage(self.discount_percentage.unwrap_or(Decimal::ZERO))
            }
            Some("amount") => Discount::Amount(self.discount_amount),
            _ => Discount::None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Invoice with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub line_items: Vec<LineItem>,
}

impl InvoiceDetail {
    /// Unsaved copy dated `invoice_date`. The copy gets its own number on save.
    pub fn as_template(&self, invoice_date: NaiveDate) -> CreateInvoice {
        CreateInvoice {
            client_id: self.invoice.client_id,
            invoice_date,
            due_date: self.invoice.due_date,
            po_number: self.invoice.po_number.clone(),
            discount: self.invoice.discount(),
            notes: self.invoice.notes.clone(),
            terms: self.invoice.terms.clone(),
            save_as_draft: true,
            line_items: self.line_items.iter().map(LineItem::to_create).collect(),
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub po_number: Option<String>,
    pub discount: Discount,
    pub notes: Option<String>,
    pub terms: Option<String>,
    /// Keep the invoice as `draft`; otherwise it is created `sent`.
    pub save_as_draft: bool,
    pub line_items: Vec<CreateLineItem>,
}

impl CreateInvoice {
    pub fn initial_status(&self) -> InvoiceStatus {
        if self.save_as_draft {
            InvoiceStatus::Draft
        } else {
            InvoiceStatus::Sent
        }
    }
}

/// Input for updating an invoice. Status fields are not editable here.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub client_id: Option<Uuid>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub po_number: Option<String>,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    /// Replaces every line item when present.
    pub line_items: Option<Vec<CreateLineItem>>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub view: RecordView,
    pub client_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub page: Page,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(status: &str, last: Option<&str>) -> Invoice {
        Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: "00042".to_string(),
            client_id: Uuid::new_v4(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            due_date: None,
            po_number: Some("PO-7".to_string()),
            discount_type: Some("percentage".to_string()),
            discount_percentage: Some(Decimal::from(10)),
            discount_amount: Decimal::from(5),
            sub_total: Decimal::from(50),
            tax_amount: Decimal::ZERO,
            invoice_total: Decimal::from(45),
            notes: None,
            terms: None,
            status: status.to_string(),
            last_invoice_status: last.map(String::from),
            archive_number: None,
            archived_at: None,
            deleted_at: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_status_fields_parse() {
        let fields = invoice("partial", Some("disputed")).status_fields().unwrap();
        assert_eq!(fields.status, InvoiceStatus::Partial);
        assert_eq!(fields.last_invoice_status, Some(InvoiceStatus::Disputed));
    }

    #[test]
    fn test_unknown_status_is_inconsistent() {
        assert!(matches!(
            invoice("void", None).status_fields(),
            Err(StatusError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_discount_from_columns() {
        let mut inv = invoice("draft", None);
        assert_eq!(inv.discount(), Discount::Percentage(Decimal::from(10)));

        inv.discount_type = Some("amount".to_string());
        assert_eq!(inv.discount(), Discount::Amount(Decimal::from(5)));

        inv.discount_type = None;
        assert_eq!(inv.discount(), Discount::None);
    }

    #[test]
    fn test_template_copies_lines_with_new_date() {
        let inv = invoice("paid", Some("partial"));
        let detail = InvoiceDetail {
            line_items: vec![LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id: inv.invoice_id,
                item_name: "Design".to_string(),
                item_description: None,
                item_unit_cost: Decimal::from(50),
                item_quantity: Decimal::ONE,
                tax1_id: None,
                tax2_id: None,
                sort_order: 0,
                created_utc: Utc::now(),
            }],
            invoice: inv,
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let template = detail.as_template(today);

        assert_eq!(template.invoice_date, today);
        assert_eq!(template.client_id, detail.invoice.client_id);
        assert_eq!(template.initial_status(), InvoiceStatus::Draft);
        assert_eq!(template.line_items.len(), 1);
        assert_eq!(template.line_items[0].item_name, "Design");
    }
}
