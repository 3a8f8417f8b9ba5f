//! Authentication infrastructure

mod jwt;

pub use jwt::{JwtClaims, JwtValidator};
