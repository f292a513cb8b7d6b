//! Billing flow tests: payments update invoice totals; goals recompute

use atrium::db::{goals, invoices, tenants, Store};

fn setup() -> (Store, String) {
    let store = Store::open_in_memory().expect("in-memory store");
    let tenant_id = {
        let conn = store.conn().unwrap();
        tenants::create_tenant(&conn, "Test Agency").unwrap().id
    };
    (store, tenant_id)
}

fn invoice(number: &str, total: f64) -> invoices::NewInvoice {
    invoices::NewInvoice {
        number: number.into(),
        client_id: None,
        amount_total: total,
        issued_on: Some("2024-03-01".into()),
        due_on: Some("2024-03-31".into()),
    }
}

fn payment(amount: f64, paid_on: &str) -> invoices::NewPayment {
    invoices::NewPayment {
        amount,
        paid_on: paid_on.into(),
        method: None,
    }
}

#[test]
fn test_partial_payment_keeps_status() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let inv = invoices::create_invoice(&conn, &tenant_id, &invoice("INV-001", 1000.0)).unwrap();
    invoices::update_invoice(
        &conn,
        &tenant_id,
        &inv.id,
        &invoices::InvoicePatch {
            status: Some("sent".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let (_, updated) =
        invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(400.0, "2024-03-10"))
            .unwrap();
    assert_eq!(updated.amount_paid, 400.0);
    assert_eq!(updated.status, "sent");
}

#[test]
fn test_full_payment_flips_to_paid() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let inv = invoices::create_invoice(&conn, &tenant_id, &invoice("INV-002", 1000.0)).unwrap();
    invoices::update_invoice(
        &conn,
        &tenant_id,
        &inv.id,
        &invoices::InvoicePatch {
            status: Some("sent".into()),
            ..Default::default()
        },
    )
    .unwrap();

    invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(600.0, "2024-03-10")).unwrap();
    let (_, updated) =
        invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(400.0, "2024-03-20"))
            .unwrap();

    assert_eq!(updated.amount_paid, 1000.0);
    assert_eq!(updated.status, "paid");

    let history = invoices::list_payments(&conn, &tenant_id, &inv.id).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn test_draft_invoice_never_autopays() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let inv = invoices::create_invoice(&conn, &tenant_id, &invoice("INV-003", 500.0)).unwrap();
    let (_, updated) =
        invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(500.0, "2024-03-10"))
            .unwrap();

    // Covered in full, but drafts keep their status
    assert_eq!(updated.amount_paid, 500.0);
    assert_eq!(updated.status, "draft");
}

#[test]
fn test_revenue_goal_recomputes_from_payments() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let inv = invoices::create_invoice(&conn, &tenant_id, &invoice("INV-004", 2000.0)).unwrap();
    invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(750.0, "2024-03-05")).unwrap();
    invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(250.0, "2024-03-20")).unwrap();
    // Outside the goal window: must not count
    invoices::record_payment(&conn, &tenant_id, &inv.id, &payment(999.0, "2024-05-01")).unwrap();

    let goal = goals::create_goal(
        &conn,
        &tenant_id,
        &goals::NewGoal {
            metric: "revenue".into(),
            target_value: 5000.0,
            window_start: "2024-03-01".into(),
            window_end: "2024-03-31".into(),
        },
    )
    .unwrap();
    assert_eq!(goal.current_value, 0.0);

    let refreshed = goals::refresh_goal(&conn, &tenant_id, &goal.id)
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_value, 1000.0);

    // The recompute persisted onto the row
    let reread = goals::get_goal(&conn, &tenant_id, &goal.id).unwrap().unwrap();
    assert_eq!(reread.current_value, 1000.0);
}
