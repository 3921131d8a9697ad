use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Closed role set. `admin` exists but is not self-registrable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    JobSeeker,
    Recruiter,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::JobSeeker => "Job seeker",
            Role::Recruiter => "Recruiter",
            Role::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>,
    pub otp_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, otp, otp_expires_at,
                   otp_verified, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, otp, otp_expires_at,
                   otp_verified, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        otp: &str,
        otp_expires_at: OffsetDateTime,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, otp, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password_hash, role, otp, otp_expires_at,
                      otp_verified, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(otp)
        .bind(otp_expires_at)
        .fetch_one(db)
        .await
    }

    /// Fresh code for a password reset. The verified flag is left untouched
    /// so the account stays usable while the reset is pending.
    pub async fn store_otp(
        db: &PgPool,
        id: i32,
        otp: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp = $2, otp_expires_at = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Fresh code for (re-)verification: the verified flag drops back to
    /// false until the new code is confirmed.
    pub async fn reset_verification(
        db: &PgPool,
        id: i32,
        otp: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp = $2, otp_expires_at = $3, otp_verified = FALSE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Successful verification consumes the code.
    pub async fn mark_verified(db: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET otp_verified = TRUE, otp = NULL, otp_expires_at = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_password(db: &PgPool, id: i32, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Password reset consumes the code along with the update.
    pub async fn complete_password_reset(
        db: &PgPool,
        id: i32,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, otp = NULL, otp_expires_at = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn email_taken_by_other(
        db: &PgPool,
        email: &str,
        id: i32,
    ) -> Result<bool, sqlx::Error> {
        let existing: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(existing.is_some())
    }

    /// Partial profile update; an email change drops the verified flag until
    /// the new address is confirmed.
    pub async fn update_profile(
        db: &PgPool,
        id: i32,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                otp_verified = CASE WHEN $3 IS NULL THEN otp_verified ELSE FALSE END,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, otp, otp_expires_at,
                      otp_verified, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(db)
        .await
    }
}
