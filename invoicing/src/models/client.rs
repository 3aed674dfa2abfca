//! Client model.

use super::{Page, RecordView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A customer that invoices are addressed to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub organization_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub business_phone: Option<String>,
    pub mobile_number: Option<String>,
    pub address_street1: Option<String>,
    pub address_street2: Option<String>,
    pub city: Option<String>,
    pub province_state: Option<String>,
    pub postal_zip_code: Option<String>,
    pub country: Option<String>,
    pub internal_notes: Option<String>,
    pub archive_number: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Client {
    /// First and last name joined with a space.
    pub fn contact_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateClient {
    #[validate(length(min = 1, max = 255))]
    pub organization_name: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub business_phone: Option<String>,
    pub mobile_number: Option<String>,
    pub address_street1: Option<String>,
    pub address_street2: Option<String>,
    pub city: Option<String>,
    pub province_state: Option<String>,
    pub postal_zip_code: Option<String>,
    pub country: Option<String>,
    pub internal_notes: Option<String>,
}

/// Input for updating a client. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateClient {
    #[validate(length(min = 1, max = 255))]
    pub organization_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub business_phone: Option<String>,
    pub mobile_number: Option<String>,
    pub address_street1: Option<String>,
    pub address_street2: Option<String>,
    pub city: Option<String>,
    pub province_state: Option<String>,
    pub postal_zip_code: Option<String>,
    pub country: Option<String>,
    pub internal_notes: Option<String>,
}

/// Filter parameters for listing clients.
#[derive(Debug, Clone, Default)]
pub struct ListClientsFilter {
    pub view: RecordView,
    pub page: Page,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(first: Option<&str>, last: Option<&str>) -> Client {
        Client {
            client_id: Uuid::new_v4(),
            organization_name: "Acme".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            email: None,
            business_phone: None,
            mobile_number: None,
            address_street1: None,
            address_street2: None,
            city: None,
            province_state: None,
            postal_zip_code: None,
            country: None,
            internal_notes: None,
            archive_number: None,
            archived_at: None,
            deleted_at: None,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn test_contact_name() {
        assert_eq!(client(Some("Ada"), Some("Lovelace")).contact_name(), "Ada Lovelace");
        assert_eq!(client(Some("Ada"), None).contact_name(), "Ada");
        assert_eq!(client(None, None).contact_name(), "");
    }

    #[test]
    fn test_create_client_validation() {
        let valid = CreateClient {
            organization_name: "Acme Corp".to_string(),
            email: Some("billing@acme.test".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let bad_email = CreateClient {
            organization_name: "Acme Corp".to_string(),
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let missing_name = CreateClient::default();
        assert!(missing_name.validate().is_err());
    }
}
