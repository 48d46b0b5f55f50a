//! Auth endpoint paths
//!
//! Paths are relative to the API base URL configured on the transport.

/// Email + password login
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Account creation
pub const SIGNUP_PATH: &str = "/api/auth/signup";

/// Refresh token exchange for a new access/refresh pair
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Email availability check during signup
pub const EMAIL_CHECK_PATH: &str = "/api/auth/check-email";

/// Nickname availability check during signup
pub const NICKNAME_CHECK_PATH: &str = "/api/auth/check-nickname";

/// Endpoints called without a bearer token. They either run before the user
/// has credentials or are the renewal call itself.
pub const DEFAULT_NO_AUTH_PATHS: &[&str] = &[
    LOGIN_PATH,
    SIGNUP_PATH,
    REFRESH_PATH,
    EMAIL_CHECK_PATH,
    NICKNAME_CHECK_PATH,
];
