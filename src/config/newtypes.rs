//! Validated newtype wrappers for connection values.
//!
//! Invalid values are rejected on construction with a [`ConfigError`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

use crate::error::ConfigError;

/// HTTP basic authentication credentials.
///
/// The `Debug` implementation masks the password, displaying only
/// `Credentials { username: "admin", password: ***** }`.
///
/// # Example
///
/// ```rust
/// use couch_api::Credentials;
///
/// let credentials = Credentials::new("admin", "secret").unwrap();
/// assert_eq!(credentials.basic_auth_header(), "Basic YWRtaW46c2VjcmV0");
/// assert!(!format!("{credentials:?}").contains("secret"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates validated credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyUsername`] if the username is empty.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let username = username.into();
        if username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        Ok(Self {
            username,
            password: password.into(),
        })
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the `Authorization` header value: `Basic base64(username:password)`.
    #[must_use]
    pub fn basic_auth_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_rejects_empty_username() {
        assert_eq!(
            Credentials::new("", "secret"),
            Err(ConfigError::EmptyUsername)
        );
    }

    #[test]
    fn test_credentials_allows_empty_password() {
        let credentials = Credentials::new("admin", "").unwrap();
        assert_eq!(credentials.basic_auth_header(), "Basic YWRtaW46");
    }

    #[test]
    fn test_basic_auth_header_encoding() {
        let credentials = Credentials::new("user", "pa:ss").unwrap();
        // base64("user:pa:ss")
        assert_eq!(credentials.basic_auth_header(), "Basic dXNlcjpwYTpzcw==");
    }

    #[test]
    fn test_debug_masks_password() {
        let credentials = Credentials::new("admin", "hunter2").unwrap();
        let debug = format!("{credentials:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("*****"));
    }
}
