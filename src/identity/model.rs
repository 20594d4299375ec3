use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// User account record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,                      // unique user ID, fixed at creation
    pub name: Option<String>,          // free-text display name
    pub email: String,                 // login identity, unique as stored
    pub password_hash: String,         // Argon2 PHC string, never the plaintext
    pub created_at: OffsetDateTime,    // creation timestamp, immutable
    pub last_login_at: OffsetDateTime, // bumped on every successful login
    pub is_active: bool,
    pub phones: Vec<Phone>,            // owned by this user, input order
}

/// Phone attached to a user. Has no lifecycle of its own: it is created
/// through the owning user and removed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phone {
    pub number: i64,         // subscriber number without codes
    pub city_code: i32,      // numeric area/city code
    pub country_code: String,
}

impl User {
    /// Build a fresh account. `created_at` and `last_login_at` both start
    /// at `now`; the account starts active with no phones.
    pub fn new(name: Option<String>, email: String, password_hash: String, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: now,
            last_login_at: now,
            is_active: true,
            phones: Vec::new(),
        }
    }

    /// Append a phone to the owned collection, preserving call order.
    pub fn attach_phone(&mut self, number: i64, city_code: i32, country_code: String) {
        self.phones.push(Phone {
            number,
            city_code,
            country_code,
        });
    }

    pub fn record_login(&mut self, at: OffsetDateTime) {
        self.last_login_at = at;
    }
}
