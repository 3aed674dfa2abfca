//! Transition table for the invoice status field.

use super::InvoiceStatus;
use rust_decimal::Decimal;
use serde::Serialize;

/// The two fields of an invoice the engine owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusFields {
    pub status: InvoiceStatus,
    pub last_invoice_status: Option<InvoiceStatus>,
}

impl StatusFields {
    pub fn new(status: InvoiceStatus) -> Self {
        Self {
            status,
            last_invoice_status: None,
        }
    }

    /// Move to `next`, remembering the current status.
    fn advance(self, next: InvoiceStatus) -> Self {
        Self {
            status: next,
            last_invoice_status: Some(self.status),
        }
    }

    /// Move to `next` without touching `last_invoice_status`.
    fn revert(self, next: InvoiceStatus) -> Self {
        Self {
            status: next,
            last_invoice_status: self.last_invoice_status,
        }
    }
}

/// Amounts the caller supplies when a payment is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmounts {
    /// Amount still owed before this payment.
    pub unpaid_before: Decimal,
    /// Amount applied to the invoice by this payment.
    pub applied: Decimal,
}

impl PaymentAmounts {
    pub fn unpaid_after(&self) -> Decimal {
        self.unpaid_before - self.applied
    }
}

/// Payment facts gathered after a payment row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaymentFacts {
    /// Any non-credit payment remains on the invoice.
    pub has_payments: bool,
    /// Status recorded by the most recent audit-trail entry, if any.
    pub previous_audited_status: Option<InvoiceStatus>,
}

/// Triggers the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Send,
    View,
    Dispute,
    RecordFullPayment(PaymentAmounts),
    RecordPartialPayment(PaymentAmounts),
    RecoverFromArchiveOrTrash,
    DeleteLastPayment(PaymentFacts),
}

impl StatusEvent {
    /// Pick the full or partial payment event for the given amounts.
    pub fn for_payment(unpaid_before: Decimal, applied: Decimal) -> Self {
        let amounts = PaymentAmounts {
            unpaid_before,
            applied,
        };
        if applied >= unpaid_before {
            StatusEvent::RecordFullPayment(amounts)
        } else {
            StatusEvent::RecordPartialPayment(amounts)
        }
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            StatusEvent::Send => "send",
            StatusEvent::View => "view",
            StatusEvent::Dispute => "dispute",
            StatusEvent::RecordFullPayment(_) => "record_full_payment",
            StatusEvent::RecordPartialPayment(_) => "record_partial_payment",
            StatusEvent::RecoverFromArchiveOrTrash => "recover_from_archive_or_trash",
            StatusEvent::DeleteLastPayment(_) => "delete_last_payment",
        }
    }
}

/// A transition the engine accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub event: StatusEvent,
    pub from: StatusFields,
    pub to: StatusFields,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// The invoice is moving out of `disputed`; the audit trail records this.
    pub fn leaves_dispute(&self) -> bool {
        self.from.status == InvoiceStatus::Disputed && self.to.status != InvoiceStatus::Disputed
    }
}

/// A transition whose precondition did not hold. The invoice is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoredTransition {
    pub event: StatusEvent,
    pub fields: StatusFields,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(Transition),
    Ignored(IgnoredTransition),
}

impl TransitionOutcome {
    /// Status fields after the outcome, whether applied or not.
    pub fn fields(&self) -> StatusFields {
        match self {
            TransitionOutcome::Applied(t) => t.to,
            TransitionOutcome::Ignored(i) => i.fields,
        }
    }

    pub fn applied(&self) -> Option<&Transition> {
        match self {
            TransitionOutcome::Applied(t) => Some(t),
            TransitionOutcome::Ignored(_) => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, TransitionOutcome::Ignored(_))
    }
}

/// The invoice status state machine.
pub struct InvoiceStatusEngine;

impl InvoiceStatusEngine {
    /// Apply `event` to `fields`.
    pub fn apply(fields: StatusFields, event: StatusEvent) -> TransitionOutcome {
        use InvoiceStatus::*;

        let next = match event {
            StatusEvent::Send => match fields.status {
                DraftPartial => Ok(fields.advance(Partial)),
                Draft | Viewed | Disputed => Ok(fields.advance(Sent)),
                _ => Err("invoice has already been sent"),
            },
            StatusEvent::View => match fields.status {
                Sent => Ok(fields.advance(Viewed)),
                _ => Err("only sent invoices can be marked viewed"),
            },
            StatusEvent::Dispute => Ok(fields.advance(Disputed)),
            StatusEvent::RecordFullPayment(amounts) => {
                if amounts.unpaid_before > Decimal::ZERO && amounts.unpaid_after() <= Decimal::ZERO
                {
                    Ok(fields.advance(Paid))
                } else {
                    Err("payment does not settle the unpaid amount")
                }
            }
            StatusEvent::RecordPartialPayment(amounts) => {
                if amounts.applied > Decimal::ZERO && amounts.unpaid_after() > Decimal::ZERO {
                    let next = match fields.status {
                        Draft | DraftPartial => DraftPartial,
                        _ => Partial,
                    };
                    Ok(fields.advance(next))
                } else {
                    Err("payment is not a partial payment")
                }
            }
            StatusEvent::RecoverFromArchiveOrTrash => match status_after_recover(fields.status) {
                Some(next) => Ok(fields.revert(next)),
                None => Err("status is kept on recovery"),
            },
            StatusEvent::DeleteLastPayment(facts) => Ok(fields.revert(status_after_payment_deleted(
                fields.status,
                facts.has_payments,
                fields.last_invoice_status,
                facts.previous_audited_status,
            ))),
        };

        match next {
            Ok(to) => TransitionOutcome::Applied(Transition {
                event,
                from: fields,
                to,
            }),
            Err(reason) => TransitionOutcome::Ignored(IgnoredTransition {
                event,
                fields,
                reason,
            }),
        }
    }
}

/// Status an invoice falls back to after one of its payments is deleted.
///
/// `has_payments` must reflect the payment set after the deletion.
/// `previous_audited_status` is only consulted for `paid` and `partial`.
pub fn status_after_payment_deleted(
    current: InvoiceStatus,
    has_payments: bool,
    last_invoice_status: Option<InvoiceStatus>,
    previous_audited_status: Option<InvoiceStatus>,
) -> InvoiceStatus {
    use InvoiceStatus::*;

    let was_disputed = previous_audited_status == Some(Disputed);

    match current {
        DraftPartial if !has_payments => Draft,
        DraftPartial => DraftPartial,
        Partial if has_payments => Partial,
        Partial if was_disputed => Disputed,
        Partial => Sent,
        // Only `paid` looks at draft-partial here; `partial` never did.
        Paid if has_payments => {
            if last_invoice_status == Some(DraftPartial) {
                DraftPartial
            } else {
                Partial
            }
        }
        Paid if was_disputed => Disputed,
        Paid if last_invoice_status == Some(Draft) => Draft,
        Paid => Sent,
        Disputed if has_payments => Partial,
        Disputed => Disputed,
        Draft | Sent | Viewed => current,
    }
}

/// Status an invoice takes when recovered from the archive or the trash.
pub fn status_after_recover(current: InvoiceStatus) -> Option<InvoiceStatus> {
    match current {
        InvoiceStatus::Paid | InvoiceStatus::Partial | InvoiceStatus::Viewed => {
            Some(InvoiceStatus::Sent)
        }
        InvoiceStatus::DraftPartial => Some(InvoiceStatus::Draft),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceStatus::*;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn fields(status: InvoiceStatus, last: Option<InvoiceStatus>) -> StatusFields {
        StatusFields {
            status,
            last_invoice_status: last,
        }
    }

    fn applied(outcome: TransitionOutcome) -> Transition {
        match outcome {
            TransitionOutcome::Applied(t) => t,
            TransitionOutcome::Ignored(i) => panic!("expected applied transition, got {:?}", i),
        }
    }

    #[test]
    fn test_send_from_draft() {
        let t = applied(InvoiceStatusEngine::apply(fields(Draft, None), StatusEvent::Send));
        assert_eq!(t.to, fields(Sent, Some(Draft)));
    }

    #[test]
    fn test_send_from_draft_partial_becomes_partial() {
        let t = applied(InvoiceStatusEngine::apply(
            fields(DraftPartial, Some(Draft)),
            StatusEvent::Send,
        ));
        assert_eq!(t.to, fields(Partial, Some(DraftPartial)));
    }

    #[test]
    fn test_send_is_ignored_when_already_sent() {
        let outcome = InvoiceStatusEngine::apply(fields(Sent, Some(Draft)), StatusEvent::Send);
        assert!(outcome.is_ignored());
        assert_eq!(outcome.fields(), fields(Sent, Some(Draft)));
    }

    #[test]
    fn test_send_ignored_for_paid_and_partial() {
        for status in [Paid, Partial] {
            assert!(InvoiceStatusEngine::apply(fields(status, None), StatusEvent::Send).is_ignored());
        }
    }

    #[test]
    fn test_view_only_from_sent() {
        let t = applied(InvoiceStatusEngine::apply(fields(Sent, Some(Draft)), StatusEvent::View));
        assert_eq!(t.to, fields(Viewed, Some(Sent)));

        assert!(InvoiceStatusEngine::apply(fields(Draft, None), StatusEvent::View).is_ignored());
        assert!(InvoiceStatusEngine::apply(fields(Paid, None), StatusEvent::View).is_ignored());
    }

    #[test]
    fn test_dispute_from_any_status() {
        for status in InvoiceStatus::ALL {
            let t = applied(InvoiceStatusEngine::apply(fields(status, None), StatusEvent::Dispute));
            assert_eq!(t.to, fields(Disputed, Some(status)));
        }
    }

    #[test]
    fn test_full_payment_from_sent() {
        let event = StatusEvent::for_payment(dec(100), dec(100));
        let t = applied(InvoiceStatusEngine::apply(fields(Sent, Some(Draft)), event));
        assert_eq!(t.to, fields(Paid, Some(Sent)));
    }

    #[test]
    fn test_full_payment_ignored_when_nothing_owed() {
        let event = StatusEvent::RecordFullPayment(PaymentAmounts {
            unpaid_before: Decimal::ZERO,
            applied: Decimal::ZERO,
        });
        assert!(InvoiceStatusEngine::apply(fields(Paid, Some(Sent)), event).is_ignored());
    }

    #[test]
    fn test_partial_payment_on_draft_is_draft_partial() {
        let event = StatusEvent::for_payment(dec(100), dec(40));
        assert!(matches!(event, StatusEvent::RecordPartialPayment(_)));

        let t = applied(InvoiceStatusEngine::apply(fields(Draft, None), event));
        assert_eq!(t.to, fields(DraftPartial, Some(Draft)));

        let t = applied(InvoiceStatusEngine::apply(t.to, StatusEvent::for_payment(dec(60), dec(10))));
        assert_eq!(t.to, fields(DraftPartial, Some(DraftPartial)));
    }

    #[test]
    fn test_partial_payment_on_sent_or_disputed_is_partial() {
        for status in [Sent, Viewed, Disputed, Partial] {
            let t = applied(InvoiceStatusEngine::apply(
                fields(status, None),
                StatusEvent::for_payment(dec(100), dec(1)),
            ));
            assert_eq!(t.to, fields(Partial, Some(status)));
        }
    }

    #[test]
    fn test_partial_payment_precondition() {
        let settles = StatusEvent::RecordPartialPayment(PaymentAmounts {
            unpaid_before: dec(50),
            applied: dec(50),
        });
        assert!(InvoiceStatusEngine::apply(fields(Sent, None), settles).is_ignored());

        let nothing = StatusEvent::RecordPartialPayment(PaymentAmounts {
            unpaid_before: dec(50),
            applied: Decimal::ZERO,
        });
        assert!(InvoiceStatusEngine::apply(fields(Sent, None), nothing).is_ignored());
    }

    #[test]
    fn test_recover_keeps_last_status() {
        let t = applied(InvoiceStatusEngine::apply(
            fields(DraftPartial, Some(Draft)),
            StatusEvent::RecoverFromArchiveOrTrash,
        ));
        assert_eq!(t.to, fields(Draft, Some(Draft)));

        for status in [Paid, Partial, Viewed] {
            let t = applied(InvoiceStatusEngine::apply(
                fields(status, Some(Sent)),
                StatusEvent::RecoverFromArchiveOrTrash,
            ));
            assert_eq!(t.to, fields(Sent, Some(Sent)));
        }

        for status in [Draft, Sent, Disputed] {
            assert!(InvoiceStatusEngine::apply(
                fields(status, None),
                StatusEvent::RecoverFromArchiveOrTrash
            )
            .is_ignored());
        }
    }

    #[test]
    fn test_delete_payment_from_paid_reverts_to_draft() {
        let event = StatusEvent::DeleteLastPayment(PaymentFacts::default());
        let t = applied(InvoiceStatusEngine::apply(fields(Paid, Some(Draft)), event));
        assert_eq!(t.to, fields(Draft, Some(Draft)));
    }

    #[test]
    fn test_delete_payment_from_disputed_with_payments_left() {
        let event = StatusEvent::DeleteLastPayment(PaymentFacts {
            has_payments: true,
            previous_audited_status: None,
        });
        let t = applied(InvoiceStatusEngine::apply(fields(Disputed, Some(Partial)), event));
        assert_eq!(t.to.status, Partial);
        assert_eq!(t.to.last_invoice_status, Some(Partial));
    }

    #[test]
    fn test_payment_deletion_table() {
        let cases = [
            // (current, has_payments, last, audited, expected)
            (DraftPartial, false, Some(Draft), None, Draft),
            (DraftPartial, true, Some(Draft), None, DraftPartial),
            (Partial, true, Some(Sent), None, Partial),
            (Partial, false, Some(Sent), Some(Disputed), Disputed),
            (Partial, false, Some(Sent), None, Sent),
            (Partial, false, Some(DraftPartial), None, Sent),
            (Paid, true, Some(DraftPartial), None, DraftPartial),
            (Paid, true, Some(Sent), None, Partial),
            (Paid, false, Some(Draft), Some(Disputed), Disputed),
            (Paid, false, Some(Draft), None, Draft),
            (Paid, false, Some(Viewed), None, Sent),
            (Paid, false, None, None, Sent),
            (Disputed, true, None, None, Partial),
            (Disputed, false, None, None, Disputed),
            (Sent, false, None, Some(Disputed), Sent),
            (Viewed, true, None, None, Viewed),
            (Draft, false, None, None, Draft),
        ];

        for (current, has_payments, last, audited, expected) in cases {
            assert_eq!(
                status_after_payment_deleted(current, has_payments, last, audited),
                expected,
                "current={} has_payments={} last={:?} audited={:?}",
                current,
                has_payments,
                last,
                audited
            );
        }
    }

    #[test]
    fn test_leaves_dispute() {
        let t = applied(InvoiceStatusEngine::apply(fields(Disputed, None), StatusEvent::Send));
        assert!(t.leaves_dispute());

        let t = applied(InvoiceStatusEngine::apply(fields(Sent, None), StatusEvent::Dispute));
        assert!(!t.leaves_dispute());
    }
}
