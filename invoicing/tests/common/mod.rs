//! Test helper module for invoicing integration tests.
//!
//! Each test app runs in its own Postgres schema. Tests return early when
//! `TEST_DATABASE_URL` is not set.

#![allow(dead_code)]

use chrono::NaiveDate;
use invoicing::config::{CurrencyConfig, DatabaseConfig, InvoicingConfig, PreviewConfig};
use invoicing::models::{Client, CreateClient, CreateInvoice, CreateLineItem, Discount, InvoiceDetail};
use invoicing::services::{init_metrics, Database, InvoicingService};
use invoicing::startup::Application;
use invoicing_core::config::Config as CoreConfig;
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoicing=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_invoicing_{}_{}", std::process::id(), counter)
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub service: InvoicingService,
    base_url: String,
    schema_name: String,
}

impl TestApp {
    /// Spawn a test application on a random port, or `None` without a test database.
    pub async fn spawn() -> Option<Self> {
        let Some(base_url) = test_database_url() else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        init_tracing();
        init_metrics();

        let schema_name = unique_schema_name();

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");

        pool.close().await;

        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let config = InvoicingConfig {
            common: CoreConfig { port: 0 },
            service_name: "invoicing-test".to_string(),
            service_version: "0.1.0".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: db_url_with_schema,
                max_connections: 5,
                min_connections: 1,
            },
            currency: CurrencyConfig::default(),
            preview: PreviewConfig {
                secret: SecretString::new("test-preview-secret".to_string()),
                base_url: "http://localhost:8080".to_string(),
            },
            mail: None,
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);
        let service = app.invoicing().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Some(TestApp {
            http_address,
            http_port,
            service,
            base_url,
            schema_name,
        })
    }

    pub fn db(&self) -> &Database {
        self.service.db()
    }

    /// Create a client with a contact email.
    pub async fn create_client(&self, organization_name: &str) -> Client {
        self.service
            .create_client(CreateClient {
                organization_name: organization_name.to_string(),
                first_name: Some("Grace".to_string()),
                last_name: Some("Hopper".to_string()),
                email: Some("grace@example.com".to_string()),
                ..Default::default()
            })
            .await
            .expect("Failed to create client")
    }

    /// Create an invoice with one untaxed line per amount.
    pub async fn create_invoice(
        &self,
        client_id: Uuid,
        invoice_date: NaiveDate,
        amounts: &[i64],
        save_as_draft: bool,
    ) -> InvoiceDetail {
        let line_items = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| CreateLineItem {
                item_name: format!("Item {}", i + 1),
                item_description: None,
                item_unit_cost: Decimal::from(*amount),
                item_quantity: Decimal::ONE,
                tax1_id: None,
                tax2_id: None,
            })
            .collect();

        self.service
            .create_invoice(CreateInvoice {
                client_id,
                invoice_date,
                due_date: None,
                po_number: None,
                discount: Discount::None,
                notes: None,
                terms: None,
                save_as_draft,
                line_items,
            })
            .await
            .expect("Failed to create invoice")
    }

    /// Drop the test schema.
    pub async fn cleanup(&self) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}
