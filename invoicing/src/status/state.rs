//! Invoice lifecycle states.

use super::StatusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Paid,
    Partial,
    DraftPartial,
    Disputed,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 7] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Viewed,
        InvoiceStatus::Paid,
        InvoiceStatus::Partial,
        InvoiceStatus::DraftPartial,
        InvoiceStatus::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::DraftPartial => "draft-partial",
            InvoiceStatus::Disputed => "disputed",
        }
    }

    /// Tooltip text shown next to the status.
    pub fn description(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Invoice created, but you have not notified your client.",
            InvoiceStatus::Sent => "Invoice created and sent to your client.",
            InvoiceStatus::Viewed => {
                "Client has clicked the invoice URL in the email and viewed the invoice in browser."
            }
            InvoiceStatus::Paid => "Client has made full payment against the invoice.",
            InvoiceStatus::Partial => "Client has made partial payment against the invoice.",
            InvoiceStatus::DraftPartial => "Payment received against the draft invoice.",
            InvoiceStatus::Disputed => "Client has disputed this invoice.",
        }
    }

    /// Statuses that have not yet been communicated to the client.
    pub fn is_draft(&self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::DraftPartial)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }
}

impl FromStr for InvoiceStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "viewed" => Ok(InvoiceStatus::Viewed),
            "paid" => Ok(InvoiceStatus::Paid),
            "partial" => Ok(InvoiceStatus::Partial),
            "draft-partial" => Ok(InvoiceStatus::DraftPartial),
            "disputed" => Ok(InvoiceStatus::Disputed),
            other => Err(StatusError::InconsistentState(other.to_string())),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_inconsistent() {
        assert_eq!(
            "overdue".parse::<InvoiceStatus>(),
            Err(StatusError::InconsistentState("overdue".to_string()))
        );
        // Underscore spelling is not accepted.
        assert!("draft_partial".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&InvoiceStatus::DraftPartial).unwrap();
        assert_eq!(json, "\"draft-partial\"");
    }

    #[test]
    fn test_every_status_has_description() {
        for status in InvoiceStatus::ALL {
            assert!(!status.description().is_empty());
        }
        assert_eq!(
            InvoiceStatus::DraftPartial.description(),
            "Payment received against the draft invoice."
        );
    }
}
