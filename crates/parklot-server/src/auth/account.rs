//! Authenticated identity.
//!
//! Admins and users live in separate tables but share one login mechanism.
//! A session stores the composite key `admin:<id>` or `user:<id>`, which is
//! parsed into an `Account` once per request.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Account {
    Admin(i64),
    User(i64),
}

impl Account {
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Admin(_) => "admin",
            Self::User(_) => "user",
        }
    }

    pub const fn id(&self) -> i64 {
        match self {
            Self::Admin(id) | Self::User(id) => *id,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role(), self.id())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Malformed account key: {0}")]
pub struct AccountParseError(String);

impl FromStr for Account {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, id) = s
            .split_once(':')
            .ok_or_else(|| AccountParseError(s.to_string()))?;
        let id: i64 = id.parse().map_err(|_| AccountParseError(s.to_string()))?;
        match role {
            "admin" => Ok(Self::Admin(id)),
            "user" => Ok(Self::User(id)),
            _ => Err(AccountParseError(s.to_string())),
        }
    }
}
