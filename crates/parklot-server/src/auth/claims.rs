//! JWT claims structure for Parklot sessions.

use serde::{Deserialize, Serialize};

use super::account::{Account, AccountParseError};

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID, also the key of the server-side session row.
    pub jti: String,
    /// Subject: the composite `role:id` account key.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn account(&self) -> Result<Account, AccountParseError> {
        self.sub.parse()
    }
}
