use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::identity::model::User;

/// Placeholder returned instead of the credential on sign-up. Fixed value,
/// never derived from the stored hash.
pub const MASKED_PASSWORD: &str = "*****";

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phones: Vec<PhoneSpec>,
}

/// Phone entry inside a sign-up request.
#[derive(Debug, Deserialize)]
pub struct PhoneSpec {
    pub number: i64,
    pub city_code: i32,
    pub country_code: String,
}

/// Response returned by both sign-up and login.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    pub token: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login_at: OffsetDateTime,
    pub phones: Vec<PhoneDto>,
}

/// Phone entry inside a user response.
#[derive(Debug, Serialize)]
pub struct PhoneDto {
    pub number: i64,
    pub city_code: i32,
    pub country_code: String,
}

impl UserResponse {
    pub fn from_user(user: &User, token: String, mask_password: bool) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            password: if mask_password {
                MASKED_PASSWORD.to_string()
            } else {
                user.password_hash.clone()
            },
            token,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
            phones: user
                .phones
                .iter()
                .map(|p| PhoneDto {
                    number: p.number,
                    city_code: p.city_code,
                    country_code: p.country_code.clone(),
                })
                .collect(),
        }
    }
}
