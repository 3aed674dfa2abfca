//! Receivables reports.
//!
//! SQL returns one row per invoice (or per client and month); the fold into
//! report rows happens here so it can be tested without a database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Label used when a report is not filtered to one client.
pub const ALL_CLIENTS: &str = "All Clients";

// -----------------------------------------------------------------------------
// Aged accounts receivable
// -----------------------------------------------------------------------------

/// An unpaid invoice as of the report date.
#[derive(Debug, Clone, FromRow)]
pub struct AgedInvoice {
    pub client_id: Uuid,
    pub client_name: String,
    pub invoice_total: Decimal,
    pub payment_received: Decimal,
    /// Days between the invoice date and the report date.
    pub age_days: i32,
}

impl AgedInvoice {
    pub fn outstanding(&self) -> Decimal {
        self.invoice_total - self.payment_received
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingBucket {
    ZeroToThirty,
    ThirtyOneToSixty,
    SixtyOneToNinety,
    NinetyOneAndAbove,
}

impl AgingBucket {
    /// Invoices dated after the report date land in the first bucket.
    pub fn for_age(days: i32) -> Self {
        match days {
            i32::MIN..=30 => AgingBucket::ZeroToThirty,
            31..=60 => AgingBucket::ThirtyOneToSixty,
            61..=90 => AgingBucket::SixtyOneToNinety,
            _ => AgingBucket::NinetyOneAndAbove,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgedReceivablesRow {
    pub client_id: Uuid,
    pub client_name: String,
    pub zero_to_thirty: Decimal,
    pub thirty_one_to_sixty: Decimal,
    pub sixty_one_to_ninety: Decimal,
    pub ninety_one_and_above: Decimal,
    pub client_total: Decimal,
}

impl AgedReceivablesRow {
    fn new(client_id: Uuid, client_name: String) -> Self {
        Self {
            client_id,
            client_name,
            zero_to_thirty: Decimal::ZERO,
            thirty_one_to_sixty: Decimal::ZERO,
            sixty_one_to_ninety: Decimal::ZERO,
            ninety_one_and_above: Decimal::ZERO,
            client_total: Decimal::ZERO,
        }
    }

    fn add(&mut self, bucket: AgingBucket, amount: Decimal) {
        let slot = match bucket {
            AgingBucket::ZeroToThirty => &mut self.zero_to_thirty,
            AgingBucket::ThirtyOneToSixty => &mut self.thirty_one_to_sixty,
            AgingBucket::SixtyOneToNinety => &mut self.sixty_one_to_ninety,
            AgingBucket::NinetyOneAndAbove => &mut self.ninety_one_and_above,
        };
        *slot += amount;
        self.client_total += amount;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgedAccountsReceivable {
    pub as_of: NaiveDate,
    pub rows: Vec<AgedReceivablesRow>,
    pub total: Decimal,
}

impl AgedAccountsReceivable {
    /// Fold invoices into one row per client. Fully settled invoices are skipped.
    /// Rows keep the order in which each client first appears.
    pub fn build(as_of: NaiveDate, invoices: Vec<AgedInvoice>) -> Self {
        let mut rows: Vec<AgedReceivablesRow> = Vec::new();
        for invoice in invoices {
            let outstanding = invoice.outstanding();
            if outstanding <= Decimal::ZERO {
                continue;
            }
            let bucket = AgingBucket::for_age(invoice.age_days);
            match rows.iter().position(|r| r.client_id == invoice.client_id) {
                Some(pos) => rows[pos].add(bucket, outstanding),
                None => {
                    let mut row = AgedReceivablesRow::new(invoice.client_id, invoice.client_name);
                    row.add(bucket, outstanding);
                    rows.push(row);
                }
            }
        }

        let total = rows.iter().map(|r| r.client_total).sum();
        Self { as_of, rows, total }
    }
}

// -----------------------------------------------------------------------------
// Revenue by client
// -----------------------------------------------------------------------------

/// Payments of one client summed over one month.
#[derive(Debug, Clone, FromRow)]
pub struct MonthlyRevenue {
    pub client_id: Uuid,
    pub client_name: String,
    /// 1 = January.
    pub month: i32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueByClientRow {
    pub client_id: Uuid,
    pub client_name: String,
    pub months: [Decimal; 12],
    pub client_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueByClient {
    pub year: i32,
    pub client_name: String,
    pub rows: Vec<RevenueByClientRow>,
    pub total: Decimal,
}

impl RevenueByClient {
    pub fn build(year: i32, client_name: Option<String>, monthly: Vec<MonthlyRevenue>) -> Self {
        let mut rows: Vec<RevenueByClientRow> = Vec::new();
        for entry in monthly {
            let Some(index) = usize::try_from(entry.month - 1).ok().filter(|i| *i < 12) else {
                continue;
            };
            let row = match rows.iter().position(|r| r.client_id == entry.client_id) {
                Some(pos) => &mut rows[pos],
                None => {
                    rows.push(RevenueByClientRow {
                        client_id: entry.client_id,
                        client_name: entry.client_name,
                        months: [Decimal::ZERO; 12],
                        client_total: Decimal::ZERO,
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            row.months[index] += entry.amount;
            row.client_total += entry.amount;
        }

        let total = rows.iter().map(|r| r.client_total).sum();
        Self {
            year,
            client_name: client_name.unwrap_or_else(|| ALL_CLIENTS.to_string()),
            rows,
            total,
        }
    }
}

// -----------------------------------------------------------------------------
// Payments collected
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PaymentCollected {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub client_name: String,
    pub payment_type: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub payment_amount: Decimal,
    pub payment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsCollected {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub client_name: String,
    pub rows: Vec<PaymentCollected>,
    pub total: Decimal,
}

impl PaymentsCollected {
    pub fn build(
        from_date: NaiveDate,
        to_date: NaiveDate,
        client_name: Option<String>,
        rows: Vec<PaymentCollected>,
    ) -> Self {
        let total = rows.iter().map(|r| r.payment_amount).sum();
        Self {
            from_date,
            to_date,
            client_name: client_name.unwrap_or_else(|| ALL_CLIENTS.to_string()),
            rows,
            total,
        }
    }

    pub fn period(&self) -> String {
        format!("Between {} and {}", self.from_date, self.to_date)
    }
}
