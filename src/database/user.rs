use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::user::User;
use crate::validation::{ValidationError, ValidationResult};
use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, Salt, SaltString};
use std::sync::LazyLock;
use uuid::Uuid;

/// A real Argon2 hash generated once at startup, used as a timing decoy
/// so that login requests for non-existent users take the same time as
/// requests for existing users.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"dummy-never-matches", Salt::from(&salt))
        .expect("failed to generate dummy hash")
        .to_string()
});

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, username: &str, email: &str, password: &str, admin: bool) -> Result<User, AppError>;
    async fn update_profile(&self, id: &Uuid, username: &str, email: &str) -> Result<User, AppError>;
    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn set_active(&self, id: &Uuid, active: bool) -> Result<(), AppError>;
    async fn touch_last_seen(&self, id: &Uuid) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl UserRepository for PostgresRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, admin, active, created_at, last_seen
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, admin, active, created_at, last_seen
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, admin, active, created_at, last_seen
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, username: &str, email: &str, password: &str, admin: bool) -> Result<User, AppError> {
        let hash = password_hash(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, admin, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, username, email, password_hash, admin, active, created_at, last_seen
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&hash)
        .bind(admin)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn update_profile(&self, id: &Uuid, username: &str, email: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $1, email = $2
            WHERE id = $3
            RETURNING id, username, email, password_hash, admin, active, created_at, last_seen
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_active(&self, id: &Uuid, active: bool) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET active = $1 WHERE id = $2").bind(active).bind(id).execute(&self.pool).await?;

        Ok(())
    }

    async fn touch_last_seen(&self, id: &Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_seen = NOW() WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }
}

/// The unique indexes on users.username and users.email are the actual
/// race-safety mechanism; the validator's pre-check only exists for a
/// friendly error. A rejected insert gets the same user-visible message.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let Some(db_error) = e.as_database_error()
        && db_error.is_unique_violation()
    {
        let error = match db_error.constraint() {
            Some(constraint) if constraint.contains("email") => ValidationError::EmailTaken,
            _ => ValidationError::UsernameTaken,
        };
        return AppError::ValidationFailed(ValidationResult::failed(error));
    }

    e.into()
}

pub(crate) fn password_hash(password: &str) -> Result<String, AppError> {
    let salt_string = SaltString::generate(&mut OsRng);
    let salt = Salt::from(&salt_string);
    let hash = PasswordHash::generate(Argon2::default(), password.as_bytes(), salt)?;

    Ok(hash.to_string())
}

pub(crate) fn verify_password(user: &User, password: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(&user.password_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)?;

    Ok(())
}

/// Perform a throwaway Argon2 verification to equalize response timing
/// regardless of whether the target account exists.
pub(crate) fn dummy_verify(password: &str) {
    let hash = PasswordHash::new(&DUMMY_HASH).expect("invalid dummy hash");
    let _ = Argon2::default().verify_password(password.as_bytes(), &hash);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_password(password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: password_hash(password).unwrap(),
            admin: false,
            active: true,
            created_at: Utc::now(),
            last_seen: None,
        }
    }

    #[test]
    fn verify_password_accepts_correct_password() {
        let user = user_with_password("abcdef");
        assert!(verify_password(&user, "abcdef").is_ok());
    }

    #[test]
    fn verify_password_rejects_wrong_password() {
        let user = user_with_password("abcdef");
        let err = verify_password(&user, "wrongpass").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn hashes_are_salted() {
        let first = password_hash("abcdef").unwrap();
        let second = password_hash("abcdef").unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_insert_user_rejects_duplicate_email() {
        // Requires a running PostgreSQL at DATABASE_URL
    }
}
