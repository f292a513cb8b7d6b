//! Workflow trigger dispatch and activity logging

use atrium::auth::Role;
use atrium::db::{activity, projects, tenants, workflows, Store};
use atrium::routes::{fire_triggers, record_activity, AuthContext};

fn setup() -> (Store, AuthContext) {
    let store = Store::open_in_memory().expect("in-memory store");
    let ctx = {
        let conn = store.conn().unwrap();
        let tenant = tenants::create_tenant(&conn, "Test Agency").unwrap();
        let user = tenants::create_user(
            &conn,
            &tenant.id,
            &tenants::NewUser {
                email: "owner@test.com".into(),
                password_hash: "hash".into(),
                display_name: "Owner".into(),
                role: Role::Owner,
                weekly_capacity_hours: 40.0,
            },
        )
        .unwrap();
        AuthContext {
            user_id: user.id,
            tenant_id: tenant.id,
            email: user.email,
            role: Role::Owner,
        }
    };
    (store, ctx)
}

#[test]
fn test_trigger_records_run_and_creates_task() {
    let (store, ctx) = setup();
    let conn = store.conn().unwrap();

    let workflow = workflows::create_workflow(
        &conn,
        &ctx.tenant_id,
        &workflows::NewWorkflow {
            name: "Kickoff on signature".into(),
            trigger: "contract.signed".into(),
            action: "create_task".into(),
            params: Some(serde_json::json!({ "title": "Schedule kickoff call" })),
        },
    )
    .unwrap();

    fire_triggers(
        &conn,
        &ctx,
        "contract.signed",
        serde_json::json!({ "contractId": "c-1" }),
    );

    let runs = workflows::list_runs(&conn, &ctx.tenant_id, &workflow.id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].trigger, "contract.signed");

    let tasks = projects::list_tasks(&conn, &ctx.tenant_id, None, None).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Schedule kickoff call");
    assert_eq!(tasks[0].status, "todo");
}

#[test]
fn test_disabled_and_unrelated_workflows_stay_quiet() {
    let (store, ctx) = setup();
    let conn = store.conn().unwrap();

    let disabled = workflows::create_workflow(
        &conn,
        &ctx.tenant_id,
        &workflows::NewWorkflow {
            name: "Disabled".into(),
            trigger: "invoice.paid".into(),
            action: "log".into(),
            params: None,
        },
    )
    .unwrap();
    workflows::update_workflow(
        &conn,
        &ctx.tenant_id,
        &disabled.id,
        &workflows::WorkflowPatch {
            is_enabled: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    let other = workflows::create_workflow(
        &conn,
        &ctx.tenant_id,
        &workflows::NewWorkflow {
            name: "Other trigger".into(),
            trigger: "client.created".into(),
            action: "log".into(),
            params: None,
        },
    )
    .unwrap();

    fire_triggers(&conn, &ctx, "invoice.paid", serde_json::json!({}));

    assert!(workflows::list_runs(&conn, &ctx.tenant_id, &disabled.id)
        .unwrap()
        .is_empty());
    assert!(workflows::list_runs(&conn, &ctx.tenant_id, &other.id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_activity_log_records_and_lists_newest_first() {
    let (store, ctx) = setup();
    let conn = store.conn().unwrap();

    record_activity(&conn, &ctx, "client", "c-1", "created", Some("Acme"));
    record_activity(&conn, &ctx, "client", "c-1", "updated", None);

    let entries = activity::list_recent(&conn, &ctx.tenant_id, 10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].verb, "updated");
    assert_eq!(entries[1].verb, "created");
    assert_eq!(entries[1].detail.as_deref(), Some("Acme"));

    // Limit caps the listing
    assert_eq!(activity::list_recent(&conn, &ctx.tenant_id, 1).unwrap().len(), 1);
}
