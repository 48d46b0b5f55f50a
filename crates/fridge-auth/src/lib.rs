//! Session credentials for the fridge API
//!
//! Provides the credential store (access token, refresh token, cached user
//! profile), the set of endpoints that must be called without a bearer
//! token, and the two calls that mint tokens: login and session refresh.
//! This crate never decides *when* to renew; that is the pipeline's job.
//!
//! Credential flow:
//! 1. `token::login()` exchanges email + password for a token pair
//! 2. Pair and profile stored via `CredentialStore::save_tokens()` / `save_user()`
//! 3. Requests read `CredentialStore::access_token()` before going out
//! 4. On a 401 the pipeline calls `token::refresh_session()` once
//! 5. The new pair replaces the old one in a single `save_tokens()` write
//! 6. If renewal fails, `CredentialStore::clear()` logs the user out

pub mod constants;
pub mod credentials;
pub mod error;
pub mod no_auth;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, UserInfo};
pub use error::{Error, Result};
pub use no_auth::NoAuthPaths;
pub use token::{LoginResult, TokenPair, login, refresh_session};
