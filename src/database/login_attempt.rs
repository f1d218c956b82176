use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::login_attempt::LoginAttempt;
use chrono::{DateTime, Duration, Utc};

/// Append-only ledger of authentication attempts.
///
/// Concurrent writers are safe because nothing here is read-modify-write;
/// the throttle threshold re-reads the ledger fresh on every check.
#[async_trait::async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    async fn record_attempt(&self, username: &str, ip_address: &str, successful: bool, user_agent: Option<&str>) -> Result<LoginAttempt, AppError>;

    /// Count of failed attempts for the exact (username, ip) pair inside
    /// the trailing window.
    async fn count_recent_failures(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<i64, AppError>;

    /// Timestamp of the oldest failure still inside the window, used to
    /// tell a throttled caller when the block will start to lift.
    async fn oldest_recent_failure(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<Option<DateTime<Utc>>, AppError>;
}

#[async_trait::async_trait]
impl LoginAttemptRepository for PostgresRepository {
    async fn record_attempt(&self, username: &str, ip_address: &str, successful: bool, user_agent: Option<&str>) -> Result<LoginAttempt, AppError> {
        let attempt = sqlx::query_as::<_, LoginAttempt>(
            r#"
            INSERT INTO login_attempts (username, ip_address, successful, user_agent)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, ip_address, successful, attempted_at, user_agent
            "#,
        )
        .bind(username)
        .bind(ip_address)
        .bind(successful)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn count_recent_failures(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<i64, AppError> {
        let cutoff = Utc::now() - Duration::hours(window_hours);

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE username = $1
              AND ip_address = $2
              AND successful = FALSE
              AND attempted_at > $3
            "#,
        )
        .bind(username)
        .bind(ip_address)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn oldest_recent_failure(&self, username: &str, ip_address: &str, window_hours: i64) -> Result<Option<DateTime<Utc>>, AppError> {
        let cutoff = Utc::now() - Duration::hours(window_hours);

        let oldest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT MIN(attempted_at) FROM login_attempts
            WHERE username = $1
              AND ip_address = $2
              AND successful = FALSE
              AND attempted_at > $3
            "#,
        )
        .bind(username)
        .bind(ip_address)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(oldest)
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_record_attempt_appends_row() {
        // Requires a running PostgreSQL at DATABASE_URL
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_count_recent_failures_excludes_old_rows() {
        // Requires a running PostgreSQL at DATABASE_URL
    }
}
