use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::identity::model::{Phone, User};

/// Storage seam for user records. The service only ever talks to this
/// trait; the Postgres implementation is the durability boundary that
/// enforces email uniqueness.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError>;

    /// Insert or update the user together with its owned phone collection.
    /// Phones are replaced wholesale so removed entries cannot linger.
    async fn save(&self, user: &User) -> Result<User, IdentityError>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: String,
    created_at: OffsetDateTime,
    last_login_at: OffsetDateTime,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct PhoneRow {
    number: i64,
    city_code: i32,
    country_code: String,
}

impl UserRow {
    fn into_user(self, phones: Vec<Phone>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            is_active: self.is_active,
            phones,
        }
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The users.email UNIQUE constraint is the authoritative duplicate guard;
/// a violation raised there is a conflict, not a storage fault.
fn save_error(e: sqlx::Error) -> IdentityError {
    if e.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
    {
        IdentityError::DuplicateEmail
    } else {
        IdentityError::Storage(e)
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityError> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)"#)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, created_at, last_login_at, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let phones = sqlx::query_as::<_, PhoneRow>(
            r#"
            SELECT number, city_code, country_code
            FROM phones
            WHERE user_id = $1
            ORDER BY position
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|p| Phone {
            number: p.number,
            city_code: p.city_code,
            country_code: p.country_code,
        })
        .collect();

        Ok(Some(row.into_user(phones)))
    }

    async fn save(&self, user: &User) -> Result<User, IdentityError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, last_login_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                last_login_at = EXCLUDED.last_login_at,
                is_active = EXCLUDED.is_active
            RETURNING id, name, email, password_hash, created_at, last_login_at, is_active
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.last_login_at)
        .bind(user.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(save_error)?;

        sqlx::query(r#"DELETE FROM phones WHERE user_id = $1"#)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        for (position, phone) in user.phones.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO phones (user_id, position, number, city_code, country_code)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(user.id)
            .bind(position as i32)
            .bind(phone.number)
            .bind(phone.city_code)
            .bind(&phone.country_code)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row.into_user(user.phones.clone()))
    }
}

/// In-process directory backing `AppState::fake()` and tests. Mirrors the
/// storage-level uniqueness rule so the conflict path behaves the same.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().expect("directory mutex poisoned").len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn exists_by_email(&self, email: &str) -> Result<bool, IdentityError> {
        let users = self.users.lock().expect("directory mutex poisoned");
        Ok(users.values().any(|u| u.email == email))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        let users = self.users.lock().expect("directory mutex poisoned");
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn save(&self, user: &User) -> Result<User, IdentityError> {
        let mut users = self.users.lock().expect("directory mutex poisoned");
        if users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(IdentityError::DuplicateEmail);
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}
