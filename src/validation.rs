use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

// Compiled once at first use; the patterns are process-wide constants.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern"));
static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9@#&%!]{3,40}$").expect("valid username pattern"));
static PASSWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9@#&%!]{6,40}$").expect("valid password pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Format,
    Conflict,
    Mismatch,
}

/// One failed credential check, carrying the message shown back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid email format")]
    EmailFormat,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Username must be 3-40 characters with letters, numbers, and @#&%!")]
    UsernameFormat,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Password must be 6-40 characters with letters, numbers, and @#&%!")]
    PasswordFormat,
    #[error("Passwords do not match")]
    PasswordMismatch,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::EmailFormat | ValidationError::UsernameFormat | ValidationError::PasswordFormat => ValidationErrorKind::Format,
            ValidationError::EmailTaken | ValidationError::UsernameTaken => ValidationErrorKind::Conflict,
            ValidationError::PasswordMismatch => ValidationErrorKind::Mismatch,
        }
    }
}

/// Outcome of a validation pass. Errors keep the order the checks ran in
/// (email, username, password, confirmation match) so the caller can show
/// every problem at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(error: ValidationError) -> Self {
        Self { errors: vec![error] }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn message(&self) -> String {
        self.errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    }

    /// Promote a failed result into the request-level error type.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_valid() { Ok(()) } else { Err(AppError::ValidationFailed(self)) }
    }
}

pub(crate) fn email_format_ok(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

pub(crate) fn username_format_ok(candidate: &str) -> bool {
    USERNAME_PATTERN.is_match(candidate)
}

pub(crate) fn password_format_ok(candidate: &str) -> bool {
    PASSWORD_PATTERN.is_match(candidate)
}

/// Checks candidate credentials for shape and uniqueness.
///
/// Uniqueness checks take an optional user id to exclude, so a profile edit
/// can re-submit the holder's own email or username without tripping a
/// self-conflict. The same functions serve registration and edit call sites.
pub struct CredentialValidator<'a, R: UserRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> CredentialValidator<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        CredentialValidator { repo }
    }

    pub async fn validate_email(&self, candidate: &str, exclude_user_id: Option<&Uuid>) -> Result<ValidationResult, AppError> {
        if !email_format_ok(candidate) {
            return Ok(ValidationResult::failed(ValidationError::EmailFormat));
        }

        if let Some(existing) = self.repo.find_user_by_email(candidate).await?
            && exclude_user_id != Some(&existing.id)
        {
            return Ok(ValidationResult::failed(ValidationError::EmailTaken));
        }

        Ok(ValidationResult::ok())
    }

    pub async fn validate_username(&self, candidate: &str, exclude_user_id: Option<&Uuid>) -> Result<ValidationResult, AppError> {
        if !username_format_ok(candidate) {
            return Ok(ValidationResult::failed(ValidationError::UsernameFormat));
        }

        if let Some(existing) = self.repo.find_user_by_username(candidate).await?
            && exclude_user_id != Some(&existing.id)
        {
            return Ok(ValidationResult::failed(ValidationError::UsernameTaken));
        }

        Ok(ValidationResult::ok())
    }

    pub fn validate_password(&self, candidate: &str) -> ValidationResult {
        if password_format_ok(candidate) {
            ValidationResult::ok()
        } else {
            ValidationResult::failed(ValidationError::PasswordFormat)
        }
    }

    /// Full registration-form check. Runs every check and accumulates all
    /// failures instead of stopping at the first one.
    pub async fn validate_registration(
        &self,
        email: &str,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<ValidationResult, AppError> {
        let mut result = ValidationResult::ok();

        result.merge(self.validate_email(email, None).await?);
        result.merge(self.validate_username(username, None).await?);
        result.merge(self.validate_password(password));

        if password != confirm_password {
            result.push(ValidationError::PasswordMismatch);
        }

        Ok(result)
    }
}
