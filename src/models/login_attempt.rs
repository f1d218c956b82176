use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One authentication attempt, successful or not. Rows are append-only;
/// the sliding-window throttle is derived from them on every check.
///
/// The username is recorded as submitted and may not belong to any user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub username: String,
    pub ip_address: String,
    pub successful: bool,
    pub attempted_at: DateTime<Utc>,
    pub user_agent: Option<String>,
}
