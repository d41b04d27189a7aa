use super::*;

#[test]
fn duration_bounds() {
    assert_eq!(validate_duration(1).unwrap(), 1);
    assert_eq!(validate_duration(480).unwrap(), 480);
    assert!(validate_duration(0).is_err());
    assert!(validate_duration(481).is_err());
}

#[test]
fn scheduled_sessions_can_close_once() {
    assert!(SessionStatus::Scheduled.can_become(SessionStatus::Completed));
    assert!(SessionStatus::Scheduled.can_become(SessionStatus::Cancelled));
    assert!(SessionStatus::Scheduled.can_become(SessionStatus::NoShow));
    assert!(!SessionStatus::Scheduled.can_become(SessionStatus::Scheduled));
}

#[test]
fn closed_sessions_are_final() {
    for closed in [SessionStatus::Completed, SessionStatus::Cancelled, SessionStatus::NoShow] {
        for next in [SessionStatus::Scheduled, SessionStatus::Completed, SessionStatus::NoShow] {
            assert!(!closed.can_become(next), "{closed:?} -> {next:?}");
        }
    }
}

#[test]
fn status_parse_round_trips() {
    for status in [
        SessionStatus::Scheduled,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
        SessionStatus::NoShow,
    ] {
        assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(serde_json::to_value(SessionStatus::NoShow).unwrap(), "no_show");
}

#[test]
fn new_session_accepts_rfc3339_timestamp() {
    let input: NewSession = serde_json::from_value(serde_json::json!({
        "trainer_id": Uuid::nil(),
        "member_id": Uuid::nil(),
        "scheduled_at": "2026-03-02T07:30:00Z"
    }))
    .unwrap();
    assert_eq!(input.scheduled_at.to_rfc3339(), "2026-03-02T07:30:00+00:00");
    assert!(input.duration_minutes.is_none());
}
