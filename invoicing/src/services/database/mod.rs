//! Database service for the invoicing crate.
//!
//! Queries are split by aggregate. Every write to an invoice's status fields
//! goes through [`history::apply_status_event`] inside a transaction.

#![allow(clippy::too_many_arguments)]

use invoicing_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

macro_rules! client_columns {
    () => {
        "client_id, organization_name, first_name, last_name, email, business_phone, mobile_number, \
         address_street1, address_street2, city, province_state, postal_zip_code, country, \
         internal_notes, archive_number, archived_at, deleted_at, created_utc, updated_utc"
    };
}

macro_rules! invoice_columns {
    () => {
        "invoice_id, invoice_number, client_id, invoice_date, due_date, po_number, discount_type, \
         discount_percentage, discount_amount, sub_total, tax_amount, invoice_total, notes, terms, \
         status, last_invoice_status, archive_number, archived_at, deleted_at, created_utc, updated_utc"
    };
}

macro_rules! line_item_columns {
    () => {
        "line_item_id, invoice_id, item_name, item_description, item_unit_cost, item_quantity, \
         tax1_id, tax2_id, sort_order, created_utc"
    };
}

macro_rules! payment_columns {
    () => {
        "payment_id, invoice_id, payment_amount, payment_type, payment_method, payment_date, notes, \
         paid_full, credit_applied, archive_number, archived_at, deleted_at, created_utc"
    };
}

/// Row filter for [`crate::models::RecordView`]; the view name is always bound as `$1`.
macro_rules! view_filter {
    () => {
        "(($1::text = 'active' AND archived_at IS NULL AND deleted_at IS NULL) \
          OR ($1::text = 'archived' AND archived_at IS NOT NULL AND deleted_at IS NULL) \
          OR ($1::text = 'deleted' AND deleted_at IS NOT NULL))"
    };
}

mod clients;
pub(crate) mod history;
mod invoices;
mod payments;
mod reports;
mod taxes;

pub use history::AppliedEvent;
pub use payments::PaymentChange;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    /// Acquire a pooled connection, e.g. to use it as a [`crate::status::StatusHistory`].
    pub async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, AppError> {
        self.pool.acquire().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to acquire connection: {}", e))
        })
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), AppError> {
    tx.commit().await.map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
    })
}

/// Token shared by every row archived in one batch.
fn archive_batch_number() -> String {
    Uuid::new_v4().simple().to_string()
}
