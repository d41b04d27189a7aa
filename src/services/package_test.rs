use super::*;

#[test]
fn duration_must_be_positive() {
    assert_eq!(validate_duration(30).unwrap(), 30);
    assert!(validate_duration(0).is_err());
    assert!(validate_duration(-7).is_err());
}

#[test]
fn session_count_allows_none_and_zero() {
    assert_eq!(validate_session_count(None).unwrap(), None);
    assert_eq!(validate_session_count(Some(0)).unwrap(), Some(0));
    assert_eq!(validate_session_count(Some(12)).unwrap(), Some(12));
    assert!(validate_session_count(Some(-1)).is_err());
}

#[test]
fn package_patch_defaults_to_no_changes() {
    let patch: PackagePatch = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(patch.name.is_none());
    assert!(patch.active.is_none());
    assert!(patch.price_cents.is_none());
}
