use super::*;

#[test]
fn clamp_limit_defaults_and_bounds() {
    assert_eq!(clamp_limit(None), 50);
    assert_eq!(clamp_limit(Some(0)), 1);
    assert_eq!(clamp_limit(Some(-4)), 1);
    assert_eq!(clamp_limit(Some(75)), 75);
    assert_eq!(clamp_limit(Some(10_000)), 200);
}

#[test]
fn clamp_offset_never_negative() {
    assert_eq!(clamp_offset(None), 0);
    assert_eq!(clamp_offset(Some(-10)), 0);
    assert_eq!(clamp_offset(Some(30)), 30);
}

#[test]
fn required_text_trims_and_rejects_blank() {
    assert_eq!(required_text("name", "  Ada ").unwrap(), "Ada");
    let err = required_text("name", "   ").unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(ref msg) if msg == "name is required"));
}

#[test]
fn optional_text_collapses_blank_to_none() {
    assert_eq!(optional_text(None), None);
    assert_eq!(optional_text(Some("  ")), None);
    assert_eq!(optional_text(Some(" note ")), Some("note".to_owned()));
}

#[test]
fn positive_amount_rejects_zero_and_negative() {
    assert_eq!(positive_amount("amount_cents", 1500).unwrap(), 1500);
    assert!(positive_amount("amount_cents", 0).is_err());
    assert!(positive_amount("amount_cents", -1).is_err());
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ServiceError::NotFound("member").error_code(), "E_NOT_FOUND");
    assert_eq!(ServiceError::Forbidden("x").error_code(), "E_FORBIDDEN");
    assert_eq!(ServiceError::Invalid("x".into()).error_code(), "E_INVALID");
    assert_eq!(ServiceError::Conflict("x".into()).error_code(), "E_CONFLICT");
    assert_eq!(ServiceError::Database(sqlx::Error::RowNotFound).error_code(), "E_DATABASE");
}

#[test]
fn non_database_sqlx_errors_stay_database() {
    let err = ServiceError::from(sqlx::Error::PoolTimedOut);
    assert!(matches!(err, ServiceError::Database(_)));
}

#[test]
fn not_found_message_names_entity() {
    assert_eq!(ServiceError::NotFound("payment").to_string(), "payment not found");
}
