use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::IdentityError;
use crate::identity::dto::{SignUpRequest, UserResponse};
use crate::identity::model::User;
use crate::identity::password;
use crate::identity::repo::UserDirectory;
use crate::identity::token::TokenIssuer;
use crate::identity::validate;

/// Orchestrates the sign-up and login flows over the directory, the
/// password hasher and the token issuer.
#[derive(Clone)]
pub struct IdentityService {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenIssuer,
}

/// The header must be present and start with the literal `"Bearer "`;
/// everything after the prefix is the raw token.
fn bearer_token(header: Option<&str>) -> Result<&str, IdentityError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(IdentityError::MissingBearerToken)
}

impl IdentityService {
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: TokenIssuer) -> Self {
        Self { directory, tokens }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<UserResponse, IdentityError> {
        validate::check_sign_up(&request)?;

        // Pre-check is an optimization; the storage uniqueness constraint
        // settles concurrent sign-ups in save().
        if self.directory.exists_by_email(&request.email).await? {
            warn!(email = %request.email, "email already registered");
            return Err(IdentityError::DuplicateEmail);
        }

        let password_hash = password::hash_async(request.password).await?;

        let now = OffsetDateTime::now_utc();
        let mut user = User::new(request.name, request.email, password_hash, now);
        for phone in request.phones {
            user.attach_phone(phone.number, phone.city_code, phone.country_code);
        }

        let user = self.directory.save(&user).await?;
        let token = self.tokens.issue(&user.email, user.id)?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(UserResponse::from_user(&user, token, true))
    }

    pub async fn login(&self, authorization: Option<&str>) -> Result<UserResponse, IdentityError> {
        let token = bearer_token(authorization)?;
        let claims = self.tokens.parse(token)?;

        let mut user = self
            .directory
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(email = %claims.sub, "token subject has no account");
                IdentityError::UserNotFound
            })?;

        user.record_login(OffsetDateTime::now_utc());
        // Rolling session: the incoming token is never reused.
        let fresh = self.tokens.issue(&user.email, user.id)?;
        let user = self.directory.save(&user).await?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(UserResponse::from_user(&user, fresh, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::identity::dto::{PhoneSpec, MASKED_PASSWORD};
    use crate::identity::repo::MemoryDirectory;
    use uuid::Uuid;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            ttl_seconds: 3600,
        }
    }

    fn service() -> (IdentityService, Arc<MemoryDirectory>, TokenIssuer) {
        let directory = Arc::new(MemoryDirectory::new());
        let issuer = TokenIssuer::new(&jwt_config());
        let service = IdentityService::new(directory.clone(), issuer.clone());
        (service, directory, issuer)
    }

    fn sign_up_request(email: &str) -> SignUpRequest {
        SignUpRequest {
            name: Some("Federico Rosales".into()),
            email: email.into(),
            password: "Abcdefg12".into(),
            phones: Vec::new(),
        }
    }

    #[tokio::test]
    async fn sign_up_masks_password_and_issues_parseable_token() {
        let (service, directory, issuer) = service();
        let response = service.sign_up(sign_up_request("a@b.com")).await.expect("sign up");

        assert_eq!(response.email, "a@b.com");
        assert_eq!(response.password, MASKED_PASSWORD);
        assert!(response.is_active);
        assert_eq!(response.created_at, response.last_login_at);

        let claims = issuer.parse(&response.token).expect("token parses");
        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.uid, response.id.to_string());

        let stored = directory
            .find_by_email("a@b.com")
            .await
            .expect("find")
            .expect("present");
        assert_ne!(stored.password_hash, "Abcdefg12");
        assert!(password::verify("Abcdefg12", &stored.password_hash).expect("verify"));
    }

    #[tokio::test]
    async fn sign_up_preserves_phone_order() {
        let (service, directory, _) = service();
        let mut request = sign_up_request("a@b.com");
        request.phones = vec![
            PhoneSpec {
                number: 12345678,
                city_code: 11,
                country_code: "54".into(),
            },
            PhoneSpec {
                number: 87654321,
                city_code: 1,
                country_code: "598".into(),
            },
        ];
        let response = service.sign_up(request).await.expect("sign up");
        assert_eq!(response.phones.len(), 2);
        assert_eq!(response.phones[0].number, 12345678);
        assert_eq!(response.phones[1].number, 87654321);

        let stored = directory
            .find_by_email("a@b.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(stored.phones[0].city_code, 11);
        assert_eq!(stored.phones[1].country_code, "598");
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email_without_writing() {
        let (service, directory, _) = service();
        service.sign_up(sign_up_request("a@b.com")).await.expect("first");
        let err = service.sign_up(sign_up_request("a@b.com")).await.unwrap_err();
        assert!(matches!(err, IdentityError::DuplicateEmail));
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_shapes() {
        let (service, _, _) = service();

        let mut request = sign_up_request("not-an-email");
        let err = service.sign_up(request).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        request = sign_up_request("a@b.com");
        request.password = "weak".into();
        let err = service.sign_up(request).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn login_rolls_the_token_and_updates_last_login() {
        let (service, directory, issuer) = service();
        let signed_up = service.sign_up(sign_up_request("a@b.com")).await.expect("sign up");

        // Back-dated token so the rolled token's claims cannot collide.
        let old_token = issuer
            .issue_at(
                "a@b.com",
                signed_up.id,
                OffsetDateTime::now_utc() - time::Duration::seconds(5),
            )
            .expect("issue");

        let header = format!("Bearer {old_token}");
        let response = service.login(Some(&header)).await.expect("login");

        assert_ne!(response.token, old_token);
        assert!(response.last_login_at >= signed_up.last_login_at);
        // Login echoes the stored hash unmasked; see DESIGN.md open question.
        assert!(response.password.starts_with("$argon2"));

        let stored = directory
            .find_by_email("a@b.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(stored.last_login_at, response.last_login_at);
    }

    #[tokio::test]
    async fn login_requires_a_bearer_header() {
        let (service, _, _) = service();
        for header in [None, Some(""), Some("Token xyz"), Some("bearer abc")] {
            let err = service.login(header).await.unwrap_err();
            assert!(matches!(err, IdentityError::MissingBearerToken));
        }
    }

    #[tokio::test]
    async fn login_rejects_unknown_subject() {
        let (service, _, issuer) = service();
        let token = issuer.issue("ghost@b.com", Uuid::new_v4()).expect("issue");
        let header = format!("Bearer {token}");
        let err = service.login(Some(&header)).await.unwrap_err();
        assert!(matches!(err, IdentityError::UserNotFound));
    }

    #[tokio::test]
    async fn login_rejects_expired_token() {
        let (service, _, issuer) = service();
        let signed_up = service.sign_up(sign_up_request("a@b.com")).await.expect("sign up");
        let stale = issuer
            .issue_at(
                "a@b.com",
                signed_up.id,
                OffsetDateTime::now_utc() - time::Duration::seconds(3700),
            )
            .expect("issue");
        let header = format!("Bearer {stale}");
        let err = service.login(Some(&header)).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenExpired));
    }

    #[tokio::test]
    async fn login_rejects_tampered_token() {
        let (service, _, _) = service();
        service.sign_up(sign_up_request("a@b.com")).await.expect("sign up");
        let foreign = TokenIssuer::new(&JwtConfig {
            secret: "other-secret".into(),
            ttl_seconds: 3600,
        });
        let token = foreign.issue("a@b.com", Uuid::new_v4()).expect("issue");
        let header = format!("Bearer {token}");
        let err = service.login(Some(&header)).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenInvalid));
    }
}
