//! Authentication for Trellis
//!
//! Provides:
//! - JWT token generation and validation
//! - Request authentication resolving the stored profile role
//! - Password hashing with Argon2

pub mod identity;
pub mod jwt;
pub mod password;

pub use identity::{authenticate, jwt_validator, Identity};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{check_password_strength, hash_password, verify_password};
