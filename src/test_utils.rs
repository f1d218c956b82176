use crate::database::login_attempt::LoginAttemptRepository;
use crate::database::user::{UserRepository, password_hash};
use crate::error::app_error::AppError;
use crate::models::login_attempt::LoginAttempt;
use crate::models::user::User;
use crate::validation::{ValidationError, ValidationResult};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

/// In-memory stand-in for the Postgres repository. Enforces the same
/// uniqueness rules the database indexes would.
#[derive(Default)]
pub struct MockRepository {
    users: Mutex<Vec<User>>,
    attempts: Mutex<Vec<LoginAttempt>>,
    /// Number of credential-store lookups by username, for asserting that
    /// throttled requests never reach the store.
    pub user_lookups: AtomicUsize,
    /// When set, every ledger append fails with a storage error.
    pub fail_appends: AtomicBool,
}

impl MockRepository {
    pub async fn seed_user(&self, username: &str, email: &str, password: &str) -> User {
        self.insert_user(username, email, password, false).await.expect("seed user")
    }

    pub fn attempts_snapshot(&self) -> Vec<LoginAttempt> {
        self.attempts.lock().unwrap().clone()
    }

    /// Insert an attempt with a chosen timestamp, for exercising failures
    /// aging out of the trailing window.
    pub fn push_attempt_at(&self, username: &str, ip_address: &str, successful: bool, attempted_at: DateTime<Utc>) {
        self.attempts.lock().unwrap().push(LoginAttempt {
            id: Uuid::new_v4(),
            username: username.to_string(),
            ip_address: ip_address.to_string(),
            successful,
            attempted_at,
            user_agent: None,
        });
    }
}

#[async_trait::async_trait]
impl UserRepository for MockRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    }

    async fn insert_user(&self, username: &str, email: &str, password: &str, admin: bool) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(AppError::ValidationFailed(ValidationResult::failed(ValidationError::EmailTaken)));
        }
        if users.iter().any(|u| u.username == username) {
            return Err(AppError::ValidationFailed(ValidationResult::failed(ValidationError::UsernameTaken)));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash(password)?,
            admin,
            active: true,
            created_at: Utc::now(),
            last_seen: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: &Uuid, username: &str, email: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email && u.id != *id) {
            return Err(AppError::ValidationFailed(ValidationResult::failed(ValidationError::EmailTaken)));
        }
        if users.iter().any(|u| u.username == username && u.id != *id) {
            return Err(AppError::ValidationFailed(ValidationResult::failed(ValidationError::UsernameTaken)));
        }

        let user = users.iter_mut().find(|u| u.id == *id).ok_or(AppError::UserNotFound)?;
        user.username = username.to_string();
        user.email = email.to_string();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: &Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == *id).ok_or(AppError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_active(&self, id: &Uuid, active: bool) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == *id).ok_or(AppError::UserNotFound)?;
        user.active = active;
        Ok(())
    }

    async fn touch_last_seen(&self, id: &Uuid) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == *id).ok_or(AppError::UserNotFound)?;
        user.last_seen = Some(Utc::now());
        Ok(())
    }
}

#[async_trait::async_trait]
impl LoginAttemptRepository for MockRepository {
    async fn record_attempt(&self, username: &str, ip_address: &str, successful: bool, user_agent: Option<&str>) -> Result<LoginAttempt, AppError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::db("Mock ledger append failure", sqlx::Error::PoolTimedOut));
        }

        let attempt = LoginAttempt {
            id: Uuid::new_v4(),
            username: username.to_string(),
            ip_address: ip_address.to_string(),
            successful,
            attempted_at: Utc::now(),
            user_agent: user_agent.map(ToString::to_string),
        };
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(attempt)
    }

    async fn count_recent_failures(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<i64, AppError> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let count = self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.username == username && a.ip_address == ip_address && !a.successful && a.attempted_at > cutoff)
            .count();
        Ok(count as i64)
    }

    async fn oldest_recent_failure(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let oldest = self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.username == username && a.ip_address == ip_address && !a.successful && a.attempted_at > cutoff)
            .map(|a| a.attempted_at)
            .min();
        Ok(oldest)
    }
}
