//! Client queries.

use super::{archive_batch_number, Database};
use crate::models::{Client, CreateClient, ListClientsFilter, Payment, UpdateClient};
use crate::services::metrics::DB_QUERY_DURATION;
use invoicing_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    /// Create a new client.
    #[instrument(skip(self, input))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(concat!(
            r#"
            INSERT INTO clients (
                client_id, organization_name, first_name, last_name, email, business_phone,
                mobile_number, address_street1, address_street2, city, province_state,
                postal_zip_code, country, internal_notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING "#,
            client_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&input.organization_name)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.business_phone)
        .bind(&input.mobile_number)
        .bind(&input.address_street1)
        .bind(&input.address_street2)
        .bind(&input.city)
        .bind(&input.province_state)
        .bind(&input.postal_zip_code)
        .bind(&input.country)
        .bind(&input.internal_notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    /// Get a client by ID, including archived and deleted ones.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(concat!(
            "SELECT ",
            client_columns!(),
            " FROM clients WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Update a client.
    #[instrument(skip(self, input), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(concat!(
            r#"
            UPDATE clients
            SET organization_name = COALESCE($2, organization_name),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                business_phone = COALESCE($6, business_phone),
                mobile_number = COALESCE($7, mobile_number),
                address_street1 = COALESCE($8, address_street1),
                address_street2 = COALESCE($9, address_street2),
                city = COALESCE($10, city),
                province_state = COALESCE($11, province_state),
                postal_zip_code = COALESCE($12, postal_zip_code),
                country = COALESCE($13, country),
                internal_notes = COALESCE($14, internal_notes),
                updated_utc = NOW()
            WHERE client_id = $1 AND deleted_at IS NULL
            RETURNING "#,
            client_columns!()
        ))
        .bind(client_id)
        .bind(&input.organization_name)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.business_phone)
        .bind(&input.mobile_number)
        .bind(&input.address_street1)
        .bind(&input.address_street2)
        .bind(&input.city)
        .bind(&input.province_state)
        .bind(&input.postal_zip_code)
        .bind(&input.country)
        .bind(&input.internal_notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        if let Some(ref c) = client {
            info!(client_id = %c.client_id, "Client updated");
        }

        Ok(client)
    }

    /// List clients, newest first.
    #[instrument(skip(self, filter), fields(view = filter.view.as_str()))]
    pub async fn list_clients(&self, filter: &ListClientsFilter) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(concat!(
            "SELECT ",
            client_columns!(),
            " FROM clients WHERE ",
            view_filter!(),
            " ORDER BY created_utc DESC LIMIT $2 OFFSET $3"
        ))
        .bind(filter.view.as_str())
        .bind(filter.page.limit())
        .bind(filter.page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Archive clients. Returns the number of rows archived.
    #[instrument(skip(self, client_ids), fields(count = client_ids.len()))]
    pub async fn archive_clients(&self, client_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["archive_clients"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET archived_at = NOW(), archive_number = $2, updated_utc = NOW()
            WHERE client_id = ANY($1) AND archived_at IS NULL AND deleted_at IS NULL
            "#,
        )
        .bind(client_ids)
        .bind(archive_batch_number())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to archive clients: {}", e)))?;

        timer.observe_duration();

        info!(archived = result.rows_affected(), "Clients archived");

        Ok(result.rows_affected())
    }

    /// Soft-delete clients.
    #[instrument(skip(self, client_ids), fields(count = client_ids.len()))]
    pub async fn delete_clients(&self, client_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_clients"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET deleted_at = NOW(), updated_utc = NOW()
            WHERE client_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(client_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete clients: {}", e)))?;

        timer.observe_duration();

        info!(deleted = result.rows_affected(), "Clients deleted");

        Ok(result.rows_affected())
    }

    /// Unarchive clients.
    #[instrument(skip(self, client_ids), fields(count = client_ids.len()))]
    pub async fn recover_archived_clients(&self, client_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_archived_clients"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET archived_at = NULL, archive_number = NULL, updated_utc = NOW()
            WHERE client_id = ANY($1) AND archived_at IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(client_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to recover archived clients: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Restore deleted clients. Recovered clients are also unarchived.
    #[instrument(skip(self, client_ids), fields(count = client_ids.len()))]
    pub async fn recover_deleted_clients(&self, client_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_deleted_clients"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET deleted_at = NULL, archived_at = NULL, archive_number = NULL, updated_utc = NOW()
            WHERE client_id = ANY($1) AND deleted_at IS NOT NULL
            "#,
        )
        .bind(client_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to recover deleted clients: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Most recent unarchived invoice of a client.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn last_invoice_id(&self, client_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["last_invoice_id"])
            .start_timer();

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT invoice_id FROM invoices
            WHERE client_id = $1 AND archived_at IS NULL AND deleted_at IS NULL
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get last invoice: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoice_id)
    }

    /// Credit payments on every invoice of a client, deleted invoices included.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn client_credit_payments(&self, client_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["client_credit_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            r#"
            FROM payments
            WHERE payment_type = 'credit'
              AND deleted_at IS NULL
              AND invoice_id IN (SELECT invoice_id FROM invoices WHERE client_id = $1)
            ORDER BY payment_date, created_utc
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get credit payments: {}", e))
        })?;

        timer.observe_duration();

        Ok(payments)
    }
}
