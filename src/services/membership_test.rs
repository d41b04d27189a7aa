use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn end_date_adds_duration() {
    assert_eq!(end_date_for(date(2026, 1, 1), 30).unwrap(), date(2026, 1, 31));
    assert_eq!(end_date_for(date(2026, 2, 15), 14).unwrap(), date(2026, 3, 1));
}

#[test]
fn end_date_crosses_leap_day() {
    assert_eq!(end_date_for(date(2028, 2, 28), 1).unwrap(), date(2028, 2, 29));
}

#[test]
fn end_date_rejects_negative_duration() {
    assert!(matches!(end_date_for(date(2026, 1, 1), -1), Err(ServiceError::Invalid(_))));
}

#[test]
fn only_active_memberships_can_be_cancelled() {
    assert!(ensure_cancellable("active", false).is_ok());
    assert!(matches!(ensure_cancellable("active", true), Err(ServiceError::Conflict(_))));
    assert!(matches!(ensure_cancellable("cancelled", false), Err(ServiceError::Conflict(_))));
    assert!(matches!(ensure_cancellable("cancelled", true), Err(ServiceError::Conflict(_))));
}

#[test]
fn new_membership_accepts_inline_payment() {
    let input: NewMembership = serde_json::from_value(serde_json::json!({
        "member_id": Uuid::nil(),
        "package_id": Uuid::nil(),
        "payment": { "method": "card" }
    }))
    .unwrap();
    let payment = input.payment.unwrap();
    assert_eq!(payment.method, PaymentMethod::Card);
    assert_eq!(payment.amount_cents, None);
    assert!(input.start_date.is_none());
}

#[test]
fn membership_state_strings() {
    assert_eq!(MembershipState::Expired.as_str(), "expired");
    let parsed: MembershipFilter = serde_json::from_value(serde_json::json!({ "status": "cancelled" })).unwrap();
    assert_eq!(parsed.status, Some(MembershipState::Cancelled));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn sale_starts_today_and_expired_rows_stay_expired() {
    use crate::services::package::{self, NewPackage};
    use crate::state::test_helpers::{integration_pool, seed_gym, seed_member};

    let pool = integration_pool().await;
    let (gym_id, owner) = seed_gym(&pool, "Renewal Gym").await;
    let member_id = seed_member(&pool, gym_id, "Renewing Member").await;
    let pkg = package::create(
        &pool,
        gym_id,
        owner,
        NewPackage { name: "Monthly".into(), description: None, duration_days: 30, price_cents: 5_000, session_count: None },
    )
    .await
    .expect("package");
    let today: NaiveDate = sqlx::query_scalar("SELECT CURRENT_DATE").fetch_one(&pool).await.expect("today");

    let sell = || NewMembership { member_id, package_id: pkg.id, start_date: None, payment: None };
    let first = create(&pool, gym_id, owner, sell()).await.expect("first sale");
    assert_eq!(first.start_date, today);

    // A second sale while the first is still running also starts today.
    let second = create(&pool, gym_id, owner, sell()).await.expect("second sale");
    assert_eq!(second.start_date, today);
    assert_eq!(second.end_date, end_date_for(today, 30).unwrap());

    let lapsed = create(
        &pool,
        gym_id,
        owner,
        NewMembership { start_date: today.checked_sub_days(Days::new(60)), ..sell() },
    )
    .await
    .expect("backdated sale");
    assert_eq!(lapsed.status, "expired");
    let err = cancel(&pool, gym_id, owner, lapsed.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let cancelled = cancel(&pool, gym_id, owner, first.id).await.expect("cancel active");
    assert_eq!(cancelled.status, "cancelled");
}
