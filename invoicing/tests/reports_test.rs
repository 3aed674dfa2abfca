//! Receivables and revenue report integration tests.

mod common;

use common::{date, dec, TestApp};
use invoicing::models::CreatePayment;
use invoicing::reports::ALL_CLIENTS;
use rust_decimal::Decimal;
use uuid::Uuid;

async fn pay(app: &TestApp, invoice_id: Uuid, amount: i64, on: chrono::NaiveDate) {
    app.service
        .record_payment(CreatePayment {
            invoice_id,
            payment_amount: dec(amount),
            payment_method: Some("cheque".to_string()),
            payment_date: on,
            notes: None,
            paid_full: false,
        })
        .await
        .expect("Failed to record payment");
}

/// Alpha: four invoices at different ages, one paid off, one paid after the
/// report date. Beta: one recent invoice.
async fn seed(app: &TestApp) -> (Uuid, Uuid) {
    let alpha = app.create_client("Alpha").await.client_id;
    let beta = app.create_client("Beta").await.client_id;

    let recent = app.create_invoice(alpha, date(2024, 6, 15), &[100], false).await.invoice;
    let aging = app.create_invoice(alpha, date(2024, 4, 20), &[200], false).await.invoice;
    let old = app.create_invoice(alpha, date(2024, 2, 1), &[300], false).await.invoice;
    let settled = app.create_invoice(alpha, date(2024, 3, 1), &[80], false).await.invoice;
    app.create_invoice(beta, date(2024, 6, 1), &[50], false).await;

    pay(app, settled.invoice_id, 80, date(2024, 3, 10)).await;
    pay(app, aging.invoice_id, 50, date(2024, 5, 1)).await;
    pay(app, old.invoice_id, 100, date(2024, 7, 15)).await;
    app.db()
        .record_credit(recent.invoice_id, dec(5), date(2024, 6, 20), None)
        .await
        .expect("Failed to record credit");

    (alpha, beta)
}

#[tokio::test]
async fn aged_receivables_bucket_outstanding_amounts() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (alpha, beta) = seed(&app).await;

    let report = app
        .db()
        .aged_accounts_receivable(date(2024, 6, 30))
        .await
        .expect("Failed to build aged receivables");

    assert_eq!(report.rows.len(), 2);

    let a = &report.rows[0];
    assert_eq!(a.client_id, alpha);
    assert_eq!(a.zero_to_thirty, dec(100));
    assert_eq!(a.thirty_one_to_sixty, Decimal::ZERO);
    assert_eq!(a.sixty_one_to_ninety, dec(150));
    // Paid after the report date, so still fully outstanding.
    assert_eq!(a.ninety_one_and_above, dec(300));
    assert_eq!(a.client_total, dec(550));

    let b = &report.rows[1];
    assert_eq!(b.client_id, beta);
    assert_eq!(b.zero_to_thirty, dec(50));

    assert_eq!(report.total, dec(600));

    app.cleanup().await;
}

#[tokio::test]
async fn revenue_by_client_sums_payments_per_month() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (alpha, _) = seed(&app).await;

    let report = app
        .db()
        .revenue_by_client(2024, Some(alpha))
        .await
        .expect("Failed to build revenue report");

    assert_eq!(report.client_name, "Alpha");
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.months[2], dec(80));
    assert_eq!(row.months[4], dec(50));
    // Credits are not revenue.
    assert_eq!(row.months[5], Decimal::ZERO);
    assert_eq!(row.months[6], dec(100));
    assert_eq!(row.client_total, dec(230));
    assert_eq!(report.total, dec(230));

    let everyone = app.db().revenue_by_client(2024, None).await.unwrap();
    assert_eq!(everyone.client_name, ALL_CLIENTS);
    assert_eq!(everyone.total, dec(230));

    let other_year = app.db().revenue_by_client(2023, None).await.unwrap();
    assert!(other_year.rows.is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn payments_collected_lists_payments_in_period() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (alpha, beta) = seed(&app).await;

    let report = app
        .db()
        .payments_collected(date(2024, 5, 1), date(2024, 7, 31), Some(alpha), None)
        .await
        .expect("Failed to build payments collected");

    assert_eq!(report.client_name, "Alpha");
    assert_eq!(report.period(), "Between 2024-05-01 and 2024-07-31");
    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.total, dec(155));
    assert_eq!(
        report
            .rows
            .iter()
            .filter(|r| r.payment_type.as_deref() == Some("credit"))
            .count(),
        1
    );

    let cheques = app
        .db()
        .payments_collected(
            date(2024, 5, 1),
            date(2024, 7, 31),
            None,
            Some("cheque".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(cheques.client_name, ALL_CLIENTS);
    assert_eq!(cheques.total, dec(150));

    let nothing = app
        .db()
        .payments_collected(date(2024, 5, 1), date(2024, 7, 31), Some(beta), None)
        .await
        .unwrap();
    assert!(nothing.rows.is_empty());
    assert_eq!(nothing.total, Decimal::ZERO);

    app.cleanup().await;
}
