//! Session model
//!
//! Sessions are issued by the external login flow; this service only reads
//! them to resolve the caller's user id.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session valid for `ttl` from now
    pub fn new(id: impl Into<String>, user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
