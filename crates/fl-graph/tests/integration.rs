//! Integration tests for fl-graph against a live Neo4j instance.
//!
//! Run with: cargo test --package fl-graph --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available. Each test seeds its own
//! root bacenta and deletes everything connected to it afterwards.

use chrono::{Duration, NaiveDate, Utc};
use fl_core::accounts::AccountStatus;
use fl_core::arrivals::{TopUpRates, VehicleEntry, VehicleType};
use fl_core::banking::{MobileNetwork, TransactionStatus};
use fl_core::history::HistoryEvent;
use fl_core::members::{Gender, MaritalStatus, MemberDetails};
use fl_core::services::ServiceForm;
use fl_core::{Amount, ChurchId, ChurchLevel, MemberId, Role, ServantKind};
use fl_graph::{GraphClient, GraphConfig, GraphError};

async fn connect_or_skip() -> Option<GraphClient> {
    let config = GraphConfig::default();
    match GraphClient::connect(&config).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

/// Seed a parentless bacenta to hang test data off.
async fn seed_bacenta(client: &GraphClient) -> ChurchId {
    let id = ChurchId::new();
    let q = neo4rs::query("CREATE (:Bacenta:Church {id: $id, name: 'Test Bacenta'})")
        .param("id", id.to_string());
    client.run(q).await.unwrap();
    id
}

async fn cleanup(client: &GraphClient, root: &ChurchId) {
    let q = neo4rs::query(
        "MATCH p = (root:Church {id: $id})-[*0..4]-(n)
         WHERE none(x IN nodes(p) WHERE x:TimeGraph)
         DETACH DELETE n",
    )
    .param("id", root.to_string());
    let _ = client.run(q).await;
}

fn details(first_name: &str) -> MemberDetails {
    let unique = MemberId::new().to_string();
    MemberDetails {
        first_name: first_name.to_string(),
        middle_name: None,
        last_name: "Mensah".to_string(),
        email: format!("{}@test.firstlove.example", &unique[..8]),
        phone_number: "+233241234567".to_string(),
        whatsapp_number: "+233241234567".to_string(),
        gender: Gender::Female,
        marital_status: MaritalStatus::Single,
        date_of_birth: NaiveDate::from_ymd_opt(1995, 3, 14).unwrap(),
        occupation: None,
        picture_url: "https://example.com/pic.jpg".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires live Neo4j - run with: cargo test --package fl-graph --test integration -- --ignored"]
async fn test_create_and_move_member() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;

    let (first, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let (second, _) = client
        .create_church(ChurchLevel::Fellowship, "Madina Fellowship", &root)
        .await
        .unwrap();

    let member = client.create_member(&details("Ama"), &first.id).await.unwrap();
    assert_eq!(member.fellowship.as_ref().map(|f| f.id), Some(first.id));

    let (from, to) = client.move_member(&member.id, &second.id).await.unwrap();
    assert_eq!(from, "Legon Fellowship");
    assert_eq!(to, "Madina Fellowship");

    let found = client.find_member_by_email(&member.email).await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(member.id));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_member_email_must_be_unique() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();

    let ama = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let kofi = client.create_member(&details("Kofi"), &fellowship.id).await.unwrap();
    assert!(client.email_in_use(&ama.email, None).await.unwrap());
    assert!(!client.email_in_use(&ama.email, Some(&ama.id)).await.unwrap());

    let mut copy = details("Esi");
    copy.email = ama.email.clone();
    let err = client.create_member(&copy, &fellowship.id).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let mut renamed = details("Kofi");
    renamed.email = ama.email.clone();
    let err = client.update_member(&kofi.id, &renamed).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    // Keeping one's own email is not a clash.
    let mut same = details("Ama");
    same.email = ama.email.clone();
    client.update_member(&ama.id, &same).await.unwrap();

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_unit_with_servants_cannot_close() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (home, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let (empty, _) = client
        .create_church(ChurchLevel::Fellowship, "Madina Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &home.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Fellowship).unwrap();
    let appointed = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: empty.name.clone(),
    };
    client
        .appoint_servant(role, &leader.id, &empty.id, &appointed, &leader.id)
        .await
        .unwrap();

    client
        .ensure_church_can_close(ChurchLevel::Fellowship, &empty.id)
        .await
        .unwrap();
    let err = client
        .close_down_church(ChurchLevel::Fellowship, &empty.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let removed = HistoryEvent::ServantRemoved {
        servant: leader.full_name(),
        role,
        church: empty.name.clone(),
    };
    client
        .dismiss_servant(role, &leader.id, &empty.id, &removed, &leader.id)
        .await
        .unwrap();
    client
        .close_down_church(ChurchLevel::Fellowship, &empty.id)
        .await
        .unwrap();

    let err = client.church_ref(&empty.id).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_role_count_skips_closed_units() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Fellowship).unwrap();
    let event = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: fellowship.name.clone(),
    };
    client
        .appoint_servant(role, &leader.id, &fellowship.id, &event, &leader.id)
        .await
        .unwrap();
    assert_eq!(client.servant_role_count(&leader.id).await.unwrap(), 1);

    // A unit closed before servants were released on close.
    let q = neo4rs::query(
        "MATCH (c:Fellowship {id: $id}) REMOVE c:Fellowship SET c:ClosedFellowship",
    )
    .param("id", fellowship.id.to_string());
    client.run(q).await.unwrap();

    assert_eq!(client.servant_role_count(&leader.id).await.unwrap(), 0);

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_self_banking_claim_and_settle_once() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Fellowship).unwrap();
    let event = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: fellowship.name.clone(),
    };
    client
        .appoint_servant(role, &leader.id, &fellowship.id, &event, &leader.id)
        .await
        .unwrap();

    let form = ServiceForm {
        service_date: Utc::now().date_naive() - Duration::days(1),
        attendance: 25,
        income: Amount::from_cedis(200.0),
        foreign_currency: None,
        number_of_tithers: 3,
        treasurers: vec![leader.id],
        treasurer_selfie: "selfie.jpg".to_string(),
        family_picture: "family.jpg".to_string(),
    };
    let record = client
        .record_service(ChurchLevel::Fellowship, &fellowship.id, &form, &leader.id)
        .await
        .unwrap();

    client
        .set_offering_payment_pending(
            &record.id,
            "ref-a",
            Amount::from_cedis(1.5),
            MobileNetwork::Mtn,
            "0241234567",
            &leader.id,
        )
        .await
        .unwrap();
    let err = client
        .set_offering_payment_pending(
            &record.id,
            "ref-b",
            Amount::from_cedis(1.5),
            MobileNetwork::Mtn,
            "0241234567",
            &leader.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let settled = client
        .set_offering_payment_status("ref-a", TransactionStatus::Success)
        .await
        .unwrap();
    assert_eq!(settled.transaction_status, Some(TransactionStatus::Success));

    let err = client
        .set_offering_payment_status("ref-a", TransactionStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let err = client
        .set_offering_payment_status("ref-unknown", TransactionStatus::Success)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { .. }));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_fellowship_with_members_cannot_close() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;

    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    client.create_member(&details("Kofi"), &fellowship.id).await.unwrap();

    let err = client
        .close_down_church(ChurchLevel::Fellowship, &fellowship.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_leader_appointment_rotates_current_history() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let first = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let second = client.create_member(&details("Esi"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Fellowship).unwrap();

    for leader in [&first, &second] {
        let event = HistoryEvent::ServantAppointed {
            servant: leader.full_name(),
            role,
            church: fellowship.name.clone(),
        };
        client
            .appoint_servant(role, &leader.id, &fellowship.id, &event, &first.id)
            .await
            .unwrap();
    }

    let q = neo4rs::query(
        "MATCH (:Church {id: $id})-[r:CURRENT_HISTORY]->(:ServiceLog) RETURN count(r) AS cnt",
    )
    .param("id", fellowship.id.to_string());
    assert_eq!(client.query_count(q).await.unwrap(), 1);

    assert_eq!(client.servant_role_count(&second.id).await.unwrap(), 1);
    let roles = client.servant_roles(&second.id).await.unwrap();
    assert_eq!(roles, vec![role]);

    let history = client.list_history(&fellowship.id.to_string(), 10).await.unwrap();
    assert!(history.len() >= 2);

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_service_banking_is_confirmed_once() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let treasurer = client.create_member(&details("Yaw"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Fellowship).unwrap();
    let event = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: fellowship.name.clone(),
    };
    client
        .appoint_servant(role, &leader.id, &fellowship.id, &event, &leader.id)
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let form = ServiceForm {
        service_date: today - Duration::days(1),
        attendance: 25,
        income: Amount::from_cedis(320.5),
        foreign_currency: None,
        number_of_tithers: 4,
        treasurers: vec![leader.id, treasurer.id],
        treasurer_selfie: "selfie.jpg".to_string(),
        family_picture: "family.jpg".to_string(),
    };
    let record = client
        .record_service(ChurchLevel::Fellowship, &fellowship.id, &form, &leader.id)
        .await
        .unwrap();
    assert_eq!(record.church.id, fellowship.id);
    assert_eq!(record.income, Amount::from_cedis(320.5));

    let week = client
        .service_in_week(ChurchLevel::Fellowship, &fellowship.id, form.service_date)
        .await
        .unwrap();
    assert_eq!(week, Some(record.id));

    let confirmed = client.confirm_banking(&record.id, &treasurer.id).await.unwrap();
    assert!(confirmed.banking_state().is_banked());

    let err = client.confirm_banking(&record.id, &treasurer.id).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let err = client
        .set_offering_payment_pending(
            &record.id,
            "ref-1",
            Amount(100),
            MobileNetwork::Mtn,
            "0241234567",
            &leader.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_vehicle_confirmed_once_and_paid() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap();
    let event = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: "Test Bacenta".to_string(),
    };
    client
        .appoint_servant(role, &leader.id, &root, &event, &leader.id)
        .await
        .unwrap();
    client
        .set_bacenta_bussing_details(
            &root,
            &TopUpRates {
                sprinter: Amount::from_cedis(100.0),
                urvan: Amount::from_cedis(80.0),
                car: Amount::from_cedis(30.0),
            },
            "0241234567",
            MobileNetwork::Mtn,
        )
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let bussing = client
        .create_bussing_record(&root, today, "mobilisation.jpg", &leader.id)
        .await
        .unwrap();
    let err = client
        .create_bussing_record(&root, today, "again.jpg", &leader.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let bussing = client
        .record_vehicles(
            &bussing.id,
            &[VehicleEntry {
                vehicle: VehicleType::Sprinter,
                attendance: 20,
                cost: Amount::from_cedis(150.0),
                outbound: false,
                picture: "bus.jpg".to_string(),
            }],
            &leader.id,
        )
        .await
        .unwrap();
    assert_eq!(bussing.vehicle_ids.len(), 1);
    let vehicle_id = bussing.vehicle_ids[0];

    let err = client
        .record_vehicles(
            &bussing.id,
            &[VehicleEntry {
                vehicle: VehicleType::Car,
                attendance: 4,
                cost: Amount::from_cedis(40.0),
                outbound: false,
                picture: "car.jpg".to_string(),
            }],
            &leader.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    let vehicle = client.get_vehicle(&vehicle_id).await.unwrap();
    assert_eq!(vehicle.rates.sprinter, Amount::from_cedis(100.0));
    assert_eq!(vehicle.leader_declaration, 20);

    client
        .confirm_vehicle(&vehicle_id, 18, Amount::from_cedis(100.0), &leader.id)
        .await
        .unwrap();
    let err = client
        .confirm_vehicle(&vehicle_id, 18, Amount::from_cedis(100.0), &leader.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    client
        .set_vehicle_payment_pending(&vehicle_id, "ref-v1", &leader.id)
        .await
        .unwrap();
    let paid = client
        .set_vehicle_payment_status(&vehicle_id, TransactionStatus::Success)
        .await
        .unwrap();
    assert_eq!(paid.transaction_status, Some(TransactionStatus::Success));
    let err = client
        .set_vehicle_payment_status(&vehicle_id, TransactionStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_expense_approval_checks_balance() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let council = ChurchId::new();
    let q = neo4rs::query(
        "MATCH (b:Bacenta {id: $root})
         CREATE (c:Council:Church {id: $id, name: 'Test Council'})
         MERGE (b)-[:TEST_FIXTURE]->(c)",
    )
    .param("root", root.to_string())
    .param("id", council.to_string());
    client.run(q).await.unwrap();

    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let admin = client.create_member(&details("Akua"), &fellowship.id).await.unwrap();

    client
        .deposit_into_council(&council, Amount::from_cedis(50.0), "Weekly", &admin.id)
        .await
        .unwrap();
    let expense = client
        .request_expense(&council, Amount::from_cedis(80.0), "Fuel", &admin.id)
        .await
        .unwrap();
    assert_eq!(expense.status, AccountStatus::PendingApproval);

    let err = client.approve_expense(&expense.id, &admin.id).await.unwrap_err();
    assert!(matches!(err, GraphError::Conflict(_)));

    client
        .deposit_into_council(&council, Amount::from_cedis(50.0), "Top up", &admin.id)
        .await
        .unwrap();
    let approved = client.approve_expense(&expense.id, &admin.id).await.unwrap();
    assert_eq!(approved.status, AccountStatus::Success);
    assert_eq!(approved.council_balance, Amount::from_cedis(20.0));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_nearby_fellowships() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    client
        .set_fellowship_location(&fellowship.id, 5.6505, -0.1962)
        .await
        .unwrap();

    let nearby = client.nearby_fellowships(5.6510, -0.1960, 1.0, 50).await.unwrap();
    assert!(nearby.iter().any(|n| n.fellowship.id == fellowship.id));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_schema_setup_is_idempotent() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    client.ensure_schema().await.unwrap();
    client.ensure_schema().await.unwrap();

    let root = seed_bacenta(&client).await;
    let unit = client.church_ref(&root).await.unwrap();
    assert_eq!(unit.level, ChurchLevel::Bacenta);

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_concurrent_approvals_cannot_overdraw() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let council = ChurchId::new();
    let q = neo4rs::query(
        "MATCH (b:Bacenta {id: $root})
         CREATE (c:Council:Church {id: $id, name: 'Test Council'})
         MERGE (b)-[:TEST_FIXTURE]->(c)",
    )
    .param("root", root.to_string())
    .param("id", council.to_string());
    client.run(q).await.unwrap();

    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let admin = client.create_member(&details("Akua"), &fellowship.id).await.unwrap();
    client
        .deposit_into_council(&council, Amount::from_cedis(100.0), "Weekly", &admin.id)
        .await
        .unwrap();
    let fuel = client
        .request_expense(&council, Amount::from_cedis(80.0), "Fuel", &admin.id)
        .await
        .unwrap();
    let rent = client
        .request_expense(&council, Amount::from_cedis(80.0), "Rent", &admin.id)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        client.approve_expense(&fuel.id, &admin.id),
        client.approve_expense(&rent.id, &admin.id)
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let approved = a.or(b).unwrap();
    assert_eq!(approved.council_balance, Amount::from_cedis(20.0));

    cleanup(&client, &root).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_concurrent_mobilisation_opens_one_record() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let root = seed_bacenta(&client).await;
    let (fellowship, _) = client
        .create_church(ChurchLevel::Fellowship, "Legon Fellowship", &root)
        .await
        .unwrap();
    let leader = client.create_member(&details("Ama"), &fellowship.id).await.unwrap();
    let role = Role::new(ServantKind::Leader, ChurchLevel::Bacenta).unwrap();
    let event = HistoryEvent::ServantAppointed {
        servant: leader.full_name(),
        role,
        church: "Test Bacenta".to_string(),
    };
    client
        .appoint_servant(role, &leader.id, &root, &event, &leader.id)
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let (a, b) = tokio::join!(
        client.create_bussing_record(&root, today, "first.jpg", &leader.id),
        client.create_bussing_record(&root, today, "second.jpg", &leader.id)
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let err = a.as_ref().err().or(b.as_ref().err()).unwrap();
    assert!(matches!(err, GraphError::Conflict(_)));

    let q = neo4rs::query(
        "MATCH (:Bacenta {id: $id})-[:HAS_HISTORY]->(:ServiceLog)-[:HAS_BUSSING]->(r:BussingRecord)
         RETURN count(r) AS cnt",
    )
    .param("id", root.to_string());
    assert_eq!(client.query_count(q).await.unwrap(), 1);

    cleanup(&client, &root).await;
}
