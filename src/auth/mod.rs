//! Authentication
//!
//! Signed bearer credentials plus the server-side token ledger. The JWT
//! proves who the caller is; the ledger decides whether that session is
//! still live. Both checks must pass on every protected request.

pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod tokens;

pub use jwt::Claims;
pub use tokens::{AccessToken, TokenLedger};
