use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Pending activation for a user. Only the digest of the token is kept.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserInvitation {
    pub token_hash: String,
    pub user_id: i64,
    pub expires_at: String,
}
