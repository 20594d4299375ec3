use lazy_static::lazy_static;
use regex::Regex;

use crate::error::IdentityError;
use crate::identity::dto::SignUpRequest;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Password policy: 8-12 characters, letters and digits only, exactly one
/// uppercase letter and exactly two digits.
pub(crate) fn check_password(password: &str) -> Result<(), String> {
    if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("password may contain only letters and digits".into());
    }
    if !(8..=12).contains(&password.len()) {
        return Err("password must be 8 to 12 characters long".into());
    }
    let uppercase = password.chars().filter(|c| c.is_ascii_uppercase()).count();
    let digits = password.chars().filter(|c| c.is_ascii_digit()).count();
    if uppercase != 1 || digits != 2 {
        return Err("password must contain exactly one uppercase letter and exactly two digits".into());
    }
    Ok(())
}

pub(crate) fn check_sign_up(request: &SignUpRequest) -> Result<(), IdentityError> {
    if !is_valid_email(&request.email) {
        return Err(IdentityError::Validation("email format is invalid".into()));
    }
    check_password(&request.password).map_err(IdentityError::Validation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("federico.rosales+test@mail.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn accepts_conforming_passwords() {
        assert!(check_password("Abcdefg12").is_ok());
        assert!(check_password("a2asfGfdfdf4").is_ok()); // 12 chars, bounds
        assert!(check_password("Abcdef12").is_ok()); // 8 chars, bounds
    }

    #[test]
    fn rejects_wrong_uppercase_count() {
        assert!(check_password("abcdefg12").is_err()); // none
        assert!(check_password("ABcdefg12").is_err()); // two
    }

    #[test]
    fn rejects_wrong_digit_count() {
        assert!(check_password("Abcdefgh1").is_err()); // one
        assert!(check_password("Abcdef123").is_err()); // three
    }

    #[test]
    fn rejects_length_out_of_bounds() {
        assert!(check_password("Abcde12").is_err()); // 7
        assert!(check_password("Abcdefghijk12").is_err()); // 13
    }

    #[test]
    fn rejects_symbols() {
        assert!(check_password("Abcdefg12!").is_err());
        assert!(check_password("Abcdef 12").is_err());
    }
}
