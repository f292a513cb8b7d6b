//! Store integration tests: tenancy, CRUD, scoping, duplicates

use atrium::auth::Role;
use atrium::db::{clients, leads, tenants, Store};
use atrium::dedupe;
use atrium::plans::{limits_for, Feature, PlanTier};

fn setup() -> (Store, String) {
    let store = Store::open_in_memory().expect("in-memory store");
    let tenant_id = {
        let conn = store.conn().unwrap();
        tenants::create_tenant(&conn, "Test Agency").unwrap().id
    };
    (store, tenant_id)
}

fn new_client(name: &str, email: Option<&str>, company: Option<&str>) -> clients::NewClient {
    clients::NewClient {
        name: name.into(),
        email: email.map(String::from),
        company: company.map(String::from),
        phone: None,
        notes: None,
        force: false,
    }
}

#[test]
fn test_tenant_and_user_round_trip() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let user = tenants::create_user(
        &conn,
        &tenant_id,
        &tenants::NewUser {
            email: "owner@test.com".into(),
            password_hash: "hash".into(),
            display_name: "Owner".into(),
            role: Role::Owner,
            weekly_capacity_hours: 40.0,
        },
    )
    .unwrap();

    assert_eq!(user.tenant_id, tenant_id);
    assert_eq!(user.role(), Role::Owner);
    assert!(user.is_active);

    let found = tenants::find_user_by_email(&conn, "owner@test.com")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);

    assert_eq!(tenants::count_users(&conn, &tenant_id).unwrap(), 1);
}

#[test]
fn test_client_crud() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let client = clients::create_client(
        &conn,
        &tenant_id,
        &new_client("Acme", Some("hello@acme.com"), Some("Acme Inc")),
    )
    .unwrap();

    let fetched = clients::get_client(&conn, &tenant_id, &client.id)
        .unwrap()
        .unwrap();
    assert_eq!(fetched.name, "Acme");

    let updated = clients::update_client(
        &conn,
        &tenant_id,
        &client.id,
        &clients::ClientPatch {
            name: Some("Acme Corp".into()),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(updated.name, "Acme Corp");
    assert_eq!(updated.email.as_deref(), Some("hello@acme.com"));

    assert!(clients::delete_client(&conn, &tenant_id, &client.id).unwrap());
    assert!(clients::get_client(&conn, &tenant_id, &client.id)
        .unwrap()
        .is_none());
}

#[test]
fn test_listings_never_cross_tenants() {
    let store = Store::open_in_memory().unwrap();
    let conn = store.conn().unwrap();

    let tenant_a = tenants::create_tenant(&conn, "A").unwrap().id;
    let tenant_b = tenants::create_tenant(&conn, "B").unwrap().id;

    clients::create_client(&conn, &tenant_a, &new_client("A Client", None, None)).unwrap();
    clients::create_client(&conn, &tenant_b, &new_client("B Client", None, None)).unwrap();

    let listed_a = clients::list_clients(&conn, &tenant_a).unwrap();
    assert_eq!(listed_a.len(), 1);
    assert_eq!(listed_a[0].name, "A Client");

    // Cross-tenant get by id returns nothing
    let b_id = clients::list_clients(&conn, &tenant_b).unwrap()[0].id.clone();
    assert!(clients::get_client(&conn, &tenant_a, &b_id).unwrap().is_none());

    assert_eq!(clients::count_clients(&conn, &tenant_a).unwrap(), 1);
}

#[test]
fn test_duplicate_candidates_stay_inside_tenant() {
    let store = Store::open_in_memory().unwrap();
    let conn = store.conn().unwrap();

    let tenant_a = tenants::create_tenant(&conn, "A").unwrap().id;
    let tenant_b = tenants::create_tenant(&conn, "B").unwrap().id;

    clients::create_client(&conn, &tenant_a, &new_client("Ada", Some("a@x.com"), None)).unwrap();
    clients::create_client(&conn, &tenant_b, &new_client("Bob", Some("a@x.com"), None)).unwrap();

    // Candidate rows are fetched per tenant, so the matcher only ever
    // sees same-tenant rows
    let rows = clients::contact_rows(&conn, &tenant_a).unwrap();
    let found = dedupe::find_candidates(&rows, Some("a@x.com"), None, 3);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Ada");
}

#[test]
fn test_duplicate_flow_exact_email() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    clients::create_client(&conn, &tenant_id, &new_client("Ada", Some("a@x.com"), None)).unwrap();

    // Same email: exactly one candidate surfaces
    let rows = clients::contact_rows(&conn, &tenant_id).unwrap();
    let found = dedupe::find_candidates(&rows, Some("a@x.com"), None, 3);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].matched_on, "email");

    // Forcing the insert anyway succeeds; both rows exist afterwards
    clients::create_client(
        &conn,
        &tenant_id,
        &clients::NewClient {
            force: true,
            ..new_client("Ada Again", Some("a@x.com"), None)
        },
    )
    .unwrap();
    assert_eq!(clients::count_clients(&conn, &tenant_id).unwrap(), 2);
}

#[test]
fn test_plan_tier_upgrade_lifts_caps_and_gates() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let plan = tenants::get_tenant_plan(&conn, &tenant_id).unwrap();
    assert_eq!(plan, PlanTier::Free);
    assert!(!plan.allows(Feature::Surveys));
    assert_eq!(limits_for(plan).max_clients, Some(10));

    tenants::set_tenant_plan(&conn, &tenant_id, PlanTier::Agency).unwrap();

    let upgraded = tenants::get_tenant_plan(&conn, &tenant_id).unwrap();
    assert_eq!(upgraded, PlanTier::Agency);
    assert!(upgraded.allows(Feature::Surveys));
    assert!(upgraded.allows(Feature::Payroll));
    assert_eq!(limits_for(upgraded).max_clients, None);
}

#[test]
fn test_lead_status_and_filtered_listing() {
    let (store, tenant_id) = setup();
    let conn = store.conn().unwrap();

    let lead = leads::create_lead(
        &conn,
        &tenant_id,
        &leads::NewLead {
            name: "Prospect".into(),
            email: None,
            company: None,
            source: Some("referral".into()),
            notes: None,
            force: false,
        },
    )
    .unwrap();
    assert_eq!(lead.status, "new");

    leads::set_lead_status(&conn, &tenant_id, &lead.id, "contacted").unwrap();

    let contacted = leads::list_leads(&conn, &tenant_id, Some("contacted")).unwrap();
    assert_eq!(contacted.len(), 1);
    assert!(leads::list_leads(&conn, &tenant_id, Some("qualified"))
        .unwrap()
        .is_empty());
}
