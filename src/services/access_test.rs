use super::*;

fn access(role: Role, gym_id: Option<Uuid>) -> Access {
    Access { user_id: Uuid::new_v4(), role, gym_id, staff_id: None, member_id: None }
}

#[test]
fn owner_has_every_capability() {
    for cap in [
        Capability::ManageGym,
        Capability::ManageStaff,
        Capability::ReviewRefunds,
        Capability::ViewActivity,
    ] {
        assert!(Role::Owner.allows(cap), "{cap:?}");
    }
}

#[test]
fn manager_cannot_manage_gym_or_staff() {
    assert!(!Role::Manager.allows(Capability::ManageGym));
    assert!(!Role::Manager.allows(Capability::ManageStaff));
    assert!(Role::Manager.allows(Capability::ReviewRefunds));
    assert!(Role::Manager.allows(Capability::ManageExpenses));
}

#[test]
fn receptionist_can_request_but_not_review_refunds() {
    assert!(Role::Receptionist.allows(Capability::RequestRefunds));
    assert!(!Role::Receptionist.allows(Capability::ReviewRefunds));
    assert!(Role::Receptionist.allows(Capability::CheckIn));
    assert!(!Role::Receptionist.allows(Capability::ManageTraining));
}

#[test]
fn trainer_is_limited_to_training_follow_ups_and_check_in() {
    assert!(Role::Trainer.allows(Capability::ManageTraining));
    assert!(Role::Trainer.allows(Capability::ManageFollowUps));
    assert!(Role::Trainer.allows(Capability::CheckIn));
    assert!(!Role::Trainer.allows(Capability::ManageMembers));
    assert!(!Role::Trainer.allows(Capability::RecordPayments));
}

#[test]
fn member_has_no_staff_capabilities() {
    assert!(!Role::Member.allows(Capability::CheckIn));
    assert!(!Role::Member.allows(Capability::ViewReports));
    assert!(!Role::Member.is_staff());
}

#[test]
fn from_staff_role_rejects_owner_and_unknown() {
    assert_eq!(Role::from_staff_role("trainer"), Some(Role::Trainer));
    assert_eq!(Role::from_staff_role("owner"), None);
    assert_eq!(Role::from_staff_role("janitor"), None);
}

#[test]
fn require_returns_gym_when_allowed() {
    let gym = Uuid::new_v4();
    assert_eq!(access(Role::Manager, Some(gym)).require(Capability::RecordPayments).unwrap(), gym);
}

#[test]
fn require_forbids_missing_capability() {
    let err = access(Role::Trainer, Some(Uuid::new_v4()))
        .require(Capability::ManageExpenses)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn require_forbids_owner_without_gym() {
    let err = access(Role::Owner, None).require(Capability::ManageGym).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn require_member_needs_linked_row() {
    let gym = Uuid::new_v4();
    let member = Uuid::new_v4();
    let mut acc = access(Role::Member, Some(gym));
    assert!(acc.require_member().is_err());
    acc.member_id = Some(member);
    assert_eq!(acc.require_member().unwrap(), (gym, member));
}

#[test]
fn trainer_scope_only_for_trainers() {
    let staff_id = Uuid::new_v4();
    let mut acc = access(Role::Trainer, Some(Uuid::new_v4()));
    acc.staff_id = Some(staff_id);
    assert_eq!(acc.trainer_scope(), Some(staff_id));
    acc.role = Role::Manager;
    assert_eq!(acc.trainer_scope(), None);
}

#[test]
fn role_serializes_snake_case() {
    assert_eq!(serde_json::to_value(Role::Receptionist).unwrap(), "receptionist");
    assert_eq!(Role::Owner.as_str(), "owner");
}

// =============================================================================
// resolve (live database)
// =============================================================================

#[cfg(feature = "live-db-tests")]
async fn add_staff(pool: &PgPool, gym_id: Uuid, user_id: Uuid, role: &str, active: bool) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO staff (gym_id, user_id, name, role, active) VALUES ($1, $2, 'Staff', $3, $4) RETURNING id",
    )
    .bind(gym_id)
    .bind(user_id)
    .bind(role)
    .bind(active)
    .fetch_one(pool)
    .await
    .expect("seed staff")
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn active_staff_row_wins_over_ownership() {
    use crate::state::test_helpers::{integration_pool, seed_gym};

    let pool = integration_pool().await;
    let (own_gym, owner) = seed_gym(&pool, "Owned Gym").await;
    let (other_gym, _) = seed_gym(&pool, "Employer Gym").await;
    let staff_id = add_staff(&pool, other_gym, owner, "manager", true).await;

    let access = resolve(&pool, owner).await.expect("resolve");
    assert_eq!(access.role, Role::Manager);
    assert_eq!(access.gym_id, Some(other_gym));
    assert_eq!(access.staff_id, Some(staff_id));
    assert_ne!(access.gym_id, Some(own_gym));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn inactive_staff_row_falls_through() {
    use crate::state::test_helpers::{integration_pool, seed_gym, seed_member, seed_user};

    let pool = integration_pool().await;
    let (own_gym, owner) = seed_gym(&pool, "Owned Gym").await;
    let (other_gym, _) = seed_gym(&pool, "Former Employer").await;
    add_staff(&pool, other_gym, owner, "trainer", false).await;

    let access = resolve(&pool, owner).await.expect("resolve owner");
    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.gym_id, Some(own_gym));
    assert_eq!(access.staff_id, None);

    let (user, _) = seed_user(&pool, "Former Trainer").await;
    add_staff(&pool, other_gym, user, "trainer", false).await;
    let member_id = seed_member(&pool, own_gym, "Former Trainer").await;
    sqlx::query("UPDATE members SET user_id = $1 WHERE id = $2")
        .bind(user)
        .bind(member_id)
        .execute(&pool)
        .await
        .expect("link member");

    let access = resolve(&pool, user).await.expect("resolve member");
    assert_eq!(access.role, Role::Member);
    assert_eq!(access.gym_id, Some(own_gym));
    assert_eq!(access.member_id, Some(member_id));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn linked_member_gets_their_gym() {
    use crate::state::test_helpers::{integration_pool, seed_gym, seed_member, seed_user};

    let pool = integration_pool().await;
    let (gym_id, _) = seed_gym(&pool, "Member Gym").await;
    let (user, _) = seed_user(&pool, "Regular").await;
    let member_id = seed_member(&pool, gym_id, "Regular").await;
    sqlx::query("UPDATE members SET user_id = $1 WHERE id = $2")
        .bind(user)
        .bind(member_id)
        .execute(&pool)
        .await
        .expect("link member");

    let access = resolve(&pool, user).await.expect("resolve");
    assert_eq!(access.role, Role::Member);
    assert_eq!(access.require_member().expect("linked member"), (gym_id, member_id));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn unlinked_user_has_no_gym() {
    use crate::state::test_helpers::{integration_pool, seed_user};

    let pool = integration_pool().await;
    let (user, _) = seed_user(&pool, "Walk In").await;

    let access = resolve(&pool, user).await.expect("resolve");
    assert_eq!(access.role, Role::Member);
    assert_eq!(access.gym_id, None);
    assert_eq!(access.member_id, None);
    assert!(access.require(Capability::CheckIn).is_err());
    assert!(access.require_member().is_err());
}
