//! Invoice status engine properties over the whole state space.

use invoicing::status::{
    InvoiceStatus, InvoiceStatusEngine, PaymentAmounts, PaymentFacts, StatusEvent, StatusFields,
    TransitionOutcome,
};
use rust_decimal::Decimal;

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn all_fields() -> Vec<StatusFields> {
    let lasts = std::iter::once(None).chain(InvoiceStatus::ALL.into_iter().map(Some));
    lasts
        .flat_map(|last| {
            InvoiceStatus::ALL.into_iter().map(move |status| StatusFields {
                status,
                last_invoice_status: last,
            })
        })
        .collect()
}

fn all_events() -> Vec<StatusEvent> {
    let mut events = vec![
        StatusEvent::Send,
        StatusEvent::View,
        StatusEvent::Dispute,
        StatusEvent::RecoverFromArchiveOrTrash,
        StatusEvent::for_payment(dec(100), dec(100)),
        StatusEvent::for_payment(dec(100), dec(40)),
        StatusEvent::RecordFullPayment(PaymentAmounts {
            unpaid_before: dec(100),
            applied: dec(40),
        }),
    ];
    for has_payments in [false, true] {
        for previous_audited_status in [None, Some(InvoiceStatus::Disputed)] {
            events.push(StatusEvent::DeleteLastPayment(PaymentFacts {
                has_payments,
                previous_audited_status,
            }));
        }
    }
    events
}

fn is_forward(event: StatusEvent) -> bool {
    !matches!(
        event,
        StatusEvent::RecoverFromArchiveOrTrash | StatusEvent::DeleteLastPayment(_)
    )
}

#[test]
fn every_pair_yields_an_enumerated_status() {
    for fields in all_fields() {
        for event in all_events() {
            let status = InvoiceStatusEngine::apply(fields, event).fields().status;
            assert!(
                InvoiceStatus::ALL.contains(&status),
                "{:?} + {:?} produced {:?}",
                fields,
                event,
                status
            );
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
    }
}

#[test]
fn ignored_events_leave_fields_untouched() {
    for fields in all_fields() {
        for event in all_events() {
            if let TransitionOutcome::Ignored(ignored) = InvoiceStatusEngine::apply(fields, event) {
                assert_eq!(ignored.fields, fields);
                assert_eq!(ignored.event, event);
                assert!(!ignored.reason.is_empty());
            }
        }
    }
}

#[test]
fn forward_transitions_remember_the_prior_status() {
    for fields in all_fields() {
        for event in all_events().into_iter().filter(|e| is_forward(*e)) {
            if let TransitionOutcome::Applied(t) = InvoiceStatusEngine::apply(fields, event) {
                assert_eq!(t.to.last_invoice_status, Some(fields.status), "{:?}", event);
            }
        }
    }
}

#[test]
fn reversals_keep_last_invoice_status() {
    for fields in all_fields() {
        for event in all_events().into_iter().filter(|e| !is_forward(*e)) {
            let after = InvoiceStatusEngine::apply(fields, event).fields();
            assert_eq!(after.last_invoice_status, fields.last_invoice_status);
        }
    }
}

#[test]
fn dispute_is_accepted_from_every_status() {
    for fields in all_fields() {
        let outcome = InvoiceStatusEngine::apply(fields, StatusEvent::Dispute);
        assert_eq!(outcome.fields().status, InvoiceStatus::Disputed);
        assert!(!outcome.is_ignored());
    }
}

#[test]
fn partial_payment_then_deletion_returns_to_sent() {
    let sent = StatusFields {
        status: InvoiceStatus::Sent,
        last_invoice_status: Some(InvoiceStatus::Draft),
    };

    let partial =
        InvoiceStatusEngine::apply(sent, StatusEvent::for_payment(dec(200), dec(50))).fields();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.last_invoice_status, Some(InvoiceStatus::Sent));

    let reverted = InvoiceStatusEngine::apply(
        partial,
        StatusEvent::DeleteLastPayment(PaymentFacts::default()),
    )
    .fields();
    assert_eq!(reverted.status, InvoiceStatus::Sent);
}

#[test]
fn draft_invoice_paid_in_two_steps_then_fully_reverted() {
    let draft = StatusFields::new(InvoiceStatus::Draft);

    let first =
        InvoiceStatusEngine::apply(draft, StatusEvent::for_payment(dec(100), dec(30))).fields();
    assert_eq!(first.status, InvoiceStatus::DraftPartial);

    let second =
        InvoiceStatusEngine::apply(first, StatusEvent::for_payment(dec(70), dec(70))).fields();
    assert_eq!(second.status, InvoiceStatus::Paid);
    assert_eq!(second.last_invoice_status, Some(InvoiceStatus::DraftPartial));

    let one_removed = InvoiceStatusEngine::apply(
        second,
        StatusEvent::DeleteLastPayment(PaymentFacts {
            has_payments: true,
            previous_audited_status: None,
        }),
    )
    .fields();
    assert_eq!(one_removed.status, InvoiceStatus::DraftPartial);

    let none_left = InvoiceStatusEngine::apply(
        one_removed,
        StatusEvent::DeleteLastPayment(PaymentFacts::default()),
    )
    .fields();
    assert_eq!(none_left.status, InvoiceStatus::Draft);
}

#[test]
fn disputed_partial_invoice_returns_to_dispute_when_payment_removed() {
    let disputed = InvoiceStatusEngine::apply(
        StatusFields::new(InvoiceStatus::Sent),
        StatusEvent::Dispute,
    )
    .fields();
    let resent = InvoiceStatusEngine::apply(disputed, StatusEvent::Send).fields();
    assert_eq!(resent.status, InvoiceStatus::Sent);
    assert_eq!(resent.last_invoice_status, Some(InvoiceStatus::Disputed));

    let partial =
        InvoiceStatusEngine::apply(resent, StatusEvent::for_payment(dec(90), dec(10))).fields();
    let reverted = InvoiceStatusEngine::apply(
        partial,
        StatusEvent::DeleteLastPayment(PaymentFacts {
            has_payments: false,
            previous_audited_status: Some(InvoiceStatus::Disputed),
        }),
    )
    .fields();
    assert_eq!(reverted.status, InvoiceStatus::Disputed);
}
