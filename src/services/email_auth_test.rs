use super::*;
use crate::services::ErrorCode;

#[test]
fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email("  Coach@Example.COM "), Some("coach@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("coach"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("coach@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

#[test]
fn normalize_code_uppercases() {
    assert_eq!(normalize_code(" abc234 "), Some("ABC234".to_owned()));
}

#[test]
fn normalize_code_rejects_ambiguous_glyphs_and_lengths() {
    assert_eq!(normalize_code("abc23"), None);
    assert_eq!(normalize_code("abc2345"), None);
    assert_eq!(normalize_code("ABC1I0"), None);
    assert_eq!(normalize_code("ABC23!"), None);
}

#[test]
fn generated_codes_round_trip_through_normalize() {
    for _ in 0..20 {
        let code = generate_access_code();
        assert_eq!(code.len(), 6);
        assert_eq!(normalize_code(&code), Some(code.clone()));
    }
}

#[test]
fn hash_access_code_is_stable_sha256_hex() {
    let a = hash_access_code("ABC234");
    assert_eq!(a, hash_access_code("ABC234"));
    assert_ne!(a, hash_access_code("ABC235"));
    assert_eq!(a.len(), 64);
}

#[test]
fn name_from_email_uses_local_part() {
    assert_eq!(name_from_email("front.desk@gym.test"), "front.desk");
    assert_eq!(name_from_email("@gym.test"), "user");
}

#[test]
fn error_codes() {
    assert_eq!(EmailAuthError::InvalidEmail.error_code(), "E_INVALID_EMAIL");
    assert_eq!(EmailAuthError::VerificationFailed.error_code(), "E_VERIFICATION_FAILED");
}
