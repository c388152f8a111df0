//! Authentication for Parklot.
//!
//! Provides password hashing, signed session tokens and the `Account`
//! identity that every authenticated request resolves to.

pub mod account;
pub mod claims;
pub mod jwt;
pub mod password;

pub use account::Account;
pub use claims::Claims;
pub use jwt::{IssuedToken, JwtManager};
pub use password::{PasswordError, hash_password, verify_password};
