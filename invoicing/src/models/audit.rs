//! Status audit trail and dispute history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Snapshot of the status fields taken when an invoice leaves `disputed`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusVersion {
    pub version_id: Uuid,
    pub invoice_id: Uuid,
    pub status: String,
    pub last_invoice_status: Option<String>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeNoteKind {
    /// Reason given by the client.
    Dispute,
    /// Reply sent back to the client.
    Response,
}

impl DisputeNoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeNoteKind::Dispute => "dispute",
            DisputeNoteKind::Response => "response",
        }
    }

    /// Subject line of the stored note and of the email it goes out with.
    pub fn subject(&self) -> &'static str {
        match self {
            DisputeNoteKind::Dispute => "Invoice disputed",
            DisputeNoteKind::Response => "Response to client",
        }
    }
}

/// One entry in an invoice's dispute history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DisputeNote {
    pub note_id: Uuid,
    pub invoice_id: Uuid,
    pub kind: String,
    pub content: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub subject: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for a dispute history entry.
#[derive(Debug, Clone)]
pub struct NewDisputeNote {
    pub kind: DisputeNoteKind,
    pub content: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
}
