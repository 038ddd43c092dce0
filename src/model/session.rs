use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-held login record. The token is the opaque handle the client
/// carries; everything else lives only on this side.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
