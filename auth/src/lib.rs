//! Authentication primitives shared by services
//!
//! Provides the I/O-free building blocks of the authentication flow:
//! - Password hashing (Argon2id)
//! - Access token issuance and verification (HS256 JWT)
//!
//! Session state, persistence and event emission belong to the services that
//! use these primitives.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Access Tokens
//! ```
//! use auth::TokenEngine;
//! use chrono::Duration;
//!
//! let engine = TokenEngine::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(24));
//! let issued = engine.issue("user123", Duration::minutes(15)).unwrap();
//! let verified = engine.verify(&issued.token).unwrap();
//! assert_eq!(verified.subject, "user123");
//! assert_eq!(verified.token_id, issued.token_id);
//! ```

pub mod jwt;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtHandler;
pub use jwt::TokenError;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::IssuedToken;
pub use token::TokenEngine;
pub use token::VerifiedToken;
