use cadence_scripting_host::{AuthorizationGate, UserGroup, UserSession};
use serde::{Deserialize, Serialize};

/// Who is running scripts and whether the host is online
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Running without a connection to the account service
    #[serde(default)]
    pub offline: bool,

    /// Logged-in account name. Leave unset to run anonymously.
    #[serde(default)]
    pub username: Option<String>,

    /// Membership group of the logged-in account
    #[serde(default)]
    pub group: Option<UserGroup>,
}

impl SessionConfig {
    pub fn user(&self) -> UserSession {
        match &self.username {
            Some(username) => UserSession::authenticated(username.clone(), self.group),
            None => UserSession::anonymous(),
        }
    }

    pub fn gate(&self) -> AuthorizationGate {
        AuthorizationGate::new(self.offline)
    }
}
