use std::env;

use tracing::{info, warn};

use crate::error::AuthError;

/// What a user presents to an [`Authenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Login name of the account running the host process.
    pub fn from_os_login() -> Result<Self, AuthError> {
        ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .map(Self::new)
            .ok_or(AuthError::MissingIdentity)
    }
}

/// A user vouched for by an authenticator. Data sources only serve
/// requests that carry one.
///
/// Only the authenticators in this crate can mint one:
///
/// ```compile_fail
/// let forged = vehicle_report::UserIdentity::new("mallory");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    username: String,
}

impl UserIdentity {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

pub trait Authenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentity, AuthError>;
}

/// Trusts the host's login and checks it against a configured allow-list.
/// No secrets are held here; an empty list admits any named user.
#[derive(Debug, Clone, Default)]
pub struct AllowListAuthenticator {
    allowed: Vec<String>,
}

impl AllowListAuthenticator {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|s| s.into().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl Authenticator for AllowListAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentity, AuthError> {
        let username = credentials.username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        if !self.allowed.is_empty() && !self.allowed.iter().any(|u| u == username) {
            warn!(user = username, "login rejected");
            return Err(AuthError::Rejected {
                username: username.to_string(),
            });
        }
        info!(user = username, "login accepted");
        Ok(UserIdentity::new(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_admits_named_users() {
        let auth = AllowListAuthenticator::default();
        let id = auth.authenticate(&Credentials::new(" ana ")).unwrap();
        assert_eq!(id.username(), "ana");
    }

    #[test]
    fn allow_list_rejects_strangers() {
        let auth = AllowListAuthenticator::new(["ana", "bruno"]);
        assert!(auth.authenticate(&Credentials::new("bruno")).is_ok());
        match auth.authenticate(&Credentials::new("carla")) {
            Err(AuthError::Rejected { username }) => assert_eq!(username, "carla"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn blank_username_has_no_identity() {
        let auth = AllowListAuthenticator::new(["ana"]);
        assert!(matches!(
            auth.authenticate(&Credentials::new("  ")),
            Err(AuthError::MissingIdentity)
        ));
    }
}
