use super::*;
use crate::services::access::Capability;

#[test]
fn staff_role_maps_to_access_role() {
    assert_eq!(Role::from(StaffRole::Manager), Role::Manager);
    assert_eq!(Role::from(StaffRole::Trainer), Role::Trainer);
    assert_eq!(Role::from(StaffRole::Receptionist), Role::Receptionist);
}

#[test]
fn stored_role_strings_round_trip_through_access() {
    for role in [StaffRole::Manager, StaffRole::Trainer, StaffRole::Receptionist] {
        assert_eq!(Role::from_staff_role(role.as_str()), Some(Role::from(role)));
    }
}

#[test]
fn new_staff_rejects_owner_role() {
    let parsed = serde_json::from_value::<NewStaff>(serde_json::json!({ "name": "Boss", "role": "owner" }));
    assert!(parsed.is_err());
}

#[test]
fn promoted_receptionist_gains_refund_review() {
    assert!(!Role::from(StaffRole::Receptionist).allows(Capability::ReviewRefunds));
    assert!(Role::from(StaffRole::Manager).allows(Capability::ReviewRefunds));
}

#[cfg(feature = "live-db-tests")]
fn receptionist(name: &str, email: &str) -> NewStaff {
    NewStaff { name: name.into(), email: Some(email.into()), phone: None, role: StaffRole::Receptionist }
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn another_gyms_owner_cannot_be_linked_as_staff() {
    use crate::services::access::{self, Role};
    use crate::state::test_helpers::{integration_pool, seed_gym};

    let pool = integration_pool().await;
    let (gym_a, owner_a) = seed_gym(&pool, "Gym A").await;
    let (gym_b, owner_b) = seed_gym(&pool, "Gym B").await;
    let owner_b_email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(owner_b)
        .fetch_one(&pool)
        .await
        .expect("owner email");

    let err = create(&pool, gym_a, owner_a, receptionist("Not Yours", &owner_b_email))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let plain = create(&pool, gym_a, owner_a, receptionist("Unlinked", "desk@gym-a.test"))
        .await
        .expect("unlinked staff should be created");
    let err = update(
        &pool,
        gym_a,
        owner_a,
        plain.id,
        StaffPatch { email: Some(owner_b_email), ..StaffPatch::default() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let access = access::resolve(&pool, owner_b).await.expect("resolve");
    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.gym_id, Some(gym_b));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn active_staff_elsewhere_cannot_be_linked_again() {
    use crate::state::test_helpers::{integration_pool, seed_gym, seed_user};

    let pool = integration_pool().await;
    let (gym_a, owner_a) = seed_gym(&pool, "Gym A").await;
    let (gym_b, owner_b) = seed_gym(&pool, "Gym B").await;
    let (_, email) = seed_user(&pool, "Desk Worker").await;

    let at_b = create(&pool, gym_b, owner_b, receptionist("Desk Worker", &email))
        .await
        .expect("first link should succeed");
    assert!(at_b.user_id.is_some());

    let err = create(&pool, gym_a, owner_a, receptionist("Desk Worker", &email))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Deactivated at B, the account is free to join A.
    update(&pool, gym_b, owner_b, at_b.id, StaffPatch { active: Some(false), ..StaffPatch::default() })
        .await
        .expect("deactivate");
    let at_a = create(&pool, gym_a, owner_a, receptionist("Desk Worker", &email))
        .await
        .expect("link after deactivation");

    // Reactivating the old row would give the account two active roles.
    let err = update(&pool, gym_b, owner_b, at_b.id, StaffPatch { active: Some(true), ..StaffPatch::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Editing the row that holds the link is not a conflict with itself.
    update(&pool, gym_a, owner_a, at_a.id, StaffPatch { email: Some(email), ..StaffPatch::default() })
        .await
        .expect("re-saving own email");
}
