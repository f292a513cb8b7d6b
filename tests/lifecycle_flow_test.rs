//! Lifecycle flow tests: transition checks over stored entities

use atrium::db::{contracts, payroll, tenants, Store};
use atrium::lifecycle::{validate_transition, LifecycleKind};

fn setup() -> (Store, String) {
    let store = Store::open_in_memory().expect("in-memory store");
    let tenant_id = {
        let conn = store.conn().unwrap();
        tenants::create_tenant(&conn, "Test Agency").unwrap().id
    };
    (store, tenant_id)
}

fn set_status(patch_status: &str) -> contracts::ContractPatch {
    contracts::ContractPatch {
        status: Some(patch_status.into()),
        ..Default::default()
    }
}

#[test]
fn test_contract_walks_to_signed() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let contract = contracts::create_contract(
        &conn,
        &tenant_id,
        &contracts::NewContract {
            title: "Retainer".into(),
            client_id: None,
            body: None,
            value: Some(12_000.0),
        },
    )
    .unwrap();
    assert_eq!(contract.status, "draft");

    let mut current = contract;
    for next in ["sent", "viewed", "signed"] {
        validate_transition(LifecycleKind::Contract, &current.status, next)
            .unwrap_or_else(|e| panic!("{}", e));
        current = contracts::update_contract(&conn, &tenant_id, &current.id, &set_status(next))
            .unwrap()
            .unwrap();
        assert_eq!(current.status, next);
    }
}

#[test]
fn test_signed_contract_refuses_every_move() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let contract = contracts::create_contract(
        &conn,
        &tenant_id,
        &contracts::NewContract {
            title: "Done deal".into(),
            client_id: None,
            body: None,
            value: None,
        },
    )
    .unwrap();

    // Drive straight to signed through the table
    for next in ["sent", "viewed", "signed"] {
        contracts::update_contract(&conn, &tenant_id, &contract.id, &set_status(next)).unwrap();
    }

    for attempted in ["draft", "sent", "viewed", "declined", "expired"] {
        let err = validate_transition(LifecycleKind::Contract, "signed", attempted).unwrap_err();
        assert!(err.to_string().contains("signed"), "{}", err);
    }
}

#[test]
fn test_declined_contract_reverts_to_draft_only() {
    assert!(validate_transition(LifecycleKind::Contract, "declined", "draft").is_ok());
    assert!(validate_transition(LifecycleKind::Contract, "declined", "sent").is_err());
    assert!(validate_transition(LifecycleKind::Contract, "declined", "signed").is_err());
}

#[test]
fn test_payroll_run_lifecycle() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let run = payroll::create_payroll_run(
        &conn,
        &tenant_id,
        &payroll::NewPayrollRun {
            period_start: "2024-03-01".into(),
            period_end: "2024-03-15".into(),
            gross_total: 25_000.0,
        },
    )
    .unwrap();
    assert_eq!(run.status, "draft");

    assert!(validate_transition(LifecycleKind::PayrollRun, "draft", "approved").is_ok());
    assert!(validate_transition(LifecycleKind::PayrollRun, "draft", "completed").is_err());

    let approved = payroll::update_payroll_run(
        &conn,
        &tenant_id,
        &run.id,
        &payroll::PayrollRunPatch {
            status: Some("approved".into()),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(approved.status, "approved");

    // Approved runs may revert to draft or complete; completed is terminal
    assert!(validate_transition(LifecycleKind::PayrollRun, "approved", "draft").is_ok());
    assert!(validate_transition(LifecycleKind::PayrollRun, "approved", "completed").is_ok());
    assert!(validate_transition(LifecycleKind::PayrollRun, "completed", "draft").is_err());
}
