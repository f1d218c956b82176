use crate::config::LoginGuardConfig;
use crate::database::login_attempt::LoginAttemptRepository;
use crate::database::user::{UserRepository, dummy_verify, password_hash, verify_password};
use crate::error::app_error::AppError;
use crate::models::user::{ChangePasswordRequest, ProfileUpdateRequest, RegisterRequest, User};
use crate::validation::{CredentialValidator, ValidationError, ValidationResult};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Registration, login and profile flows, throttled by the sliding-window
/// attempt ledger.
pub struct AuthService<'a, R: UserRepository + LoginAttemptRepository + ?Sized> {
    repo: &'a R,
    guard: LoginGuardConfig,
}

impl<'a, R: UserRepository + LoginAttemptRepository + ?Sized> AuthService<'a, R> {
    pub fn new(repo: &'a R, guard: LoginGuardConfig) -> Self {
        AuthService { repo, guard }
    }

    /// Whether the (username, ip) pair has hit the failure threshold inside
    /// the trailing window. Derived from the ledger on every call; there is
    /// no stored block state and no explicit unblock.
    pub async fn is_rate_limited(&self, username: &str, ip_address: &str) -> Result<bool, AppError> {
        let failures = self.repo.count_recent_failures(username, ip_address, self.guard.window_hours).await?;
        Ok(failures >= self.guard.max_attempts)
    }

    /// Authenticate a username/password pair from the given source address.
    ///
    /// Unknown usernames, deactivated accounts, and wrong passwords all
    /// yield the identical `InvalidCredentials` error so responses cannot
    /// be used to enumerate accounts. Every attempt lands in the ledger;
    /// a ledger append failure is logged but never changes the outcome.
    pub async fn authenticate(&self, username: &str, password: &str, ip_address: &str, user_agent: Option<&str>) -> Result<User, AppError> {
        if self.is_rate_limited(username, ip_address).await? {
            let retry_after_seconds = self.retry_after_seconds(username, ip_address).await;
            self.record_attempt_best_effort(username, ip_address, false, user_agent).await;
            warn!(username = %username, ip_address = %ip_address, "login attempt rate limited");
            return Err(AppError::RateLimited { retry_after_seconds });
        }

        match self.repo.find_user_by_username(username).await? {
            Some(user) if user.active => match verify_password(&user, password) {
                Ok(()) => {
                    self.record_attempt_best_effort(username, ip_address, true, user_agent).await;
                    if let Err(e) = self.repo.touch_last_seen(&user.id).await {
                        warn!(username = %username, error = %e, "failed to update last_seen");
                    }
                    info!(username = %username, "login succeeded");
                    Ok(user)
                }
                Err(AppError::InvalidCredentials) => {
                    self.record_attempt_best_effort(username, ip_address, false, user_agent).await;
                    Err(AppError::InvalidCredentials)
                }
                Err(other) => Err(other),
            },
            _ => {
                // Equalize timing for unknown or deactivated accounts.
                dummy_verify(password);
                self.record_attempt_best_effort(username, ip_address, false, user_agent).await;
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Validate and create a new account. The validator's uniqueness
    /// pre-check gives the friendly message; the unique indexes still catch
    /// a racing duplicate insert and surface the same message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AppError> {
        let validator = CredentialValidator::new(self.repo);
        validator
            .validate_registration(&request.email, &request.username, &request.password, &request.confirm_password)
            .await?
            .into_result()?;

        let admin = request.username.eq_ignore_ascii_case("admin");
        let user = self.repo.insert_user(&request.username, &request.email, &request.password, admin).await?;
        info!(username = %user.username, admin = user.admin, "account created");

        Ok(user)
    }

    /// Update email and username, excluding the holder from the uniqueness
    /// checks so re-submitting current values passes.
    pub async fn update_profile(&self, user_id: &Uuid, request: &ProfileUpdateRequest) -> Result<User, AppError> {
        let validator = CredentialValidator::new(self.repo);

        let mut result = ValidationResult::ok();
        result.merge(validator.validate_email(&request.email, Some(user_id)).await?);
        result.merge(validator.validate_username(&request.username, Some(user_id)).await?);
        result.into_result()?;

        self.repo.update_profile(user_id, &request.username, &request.email).await
    }

    pub async fn change_password(&self, user_id: &Uuid, request: &ChangePasswordRequest) -> Result<(), AppError> {
        let user = self.repo.find_user_by_id(user_id).await?.ok_or(AppError::UserNotFound)?;
        verify_password(&user, &request.current_password).map_err(|_| AppError::BadRequest("Current password is incorrect".to_string()))?;

        let validator = CredentialValidator::new(self.repo);
        let mut result = validator.validate_password(&request.new_password);
        if request.new_password != request.confirm_password {
            result.push(ValidationError::PasswordMismatch);
        }
        result.into_result()?;

        if request.new_password == request.current_password {
            return Err(AppError::BadRequest("New password must be different from current password".to_string()));
        }

        let hash = password_hash(&request.new_password)?;
        self.repo.update_password_hash(&user.id, &hash).await?;

        Ok(())
    }

    /// Accounts are deactivated instead of deleted.
    pub async fn set_active(&self, user_id: &Uuid, active: bool) -> Result<(), AppError> {
        self.repo.find_user_by_id(user_id).await?.ok_or(AppError::UserNotFound)?;
        self.repo.set_active(user_id, active).await
    }

    /// Seconds until the oldest failure ages out of the window. Best-effort;
    /// a throttled caller still gets throttled if this read fails.
    async fn retry_after_seconds(&self, username: &str, ip_address: &str) -> Option<i64> {
        match self.repo.oldest_recent_failure(username, ip_address, self.guard.window_hours).await {
            Ok(Some(oldest)) => {
                let lifts_at = oldest + Duration::hours(self.guard.window_hours);
                Some((lifts_at - Utc::now()).num_seconds().max(0))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(username = %username, error = %e, "failed to compute retry-after");
                None
            }
        }
    }

    async fn record_attempt_best_effort(&self, username: &str, ip_address: &str, successful: bool, user_agent: Option<&str>) {
        if let Err(e) = self.repo.record_attempt(username, ip_address, successful, user_agent).await {
            warn!(username = %username, ip_address = %ip_address, error = %e, "failed to record login attempt");
        }
    }
}
