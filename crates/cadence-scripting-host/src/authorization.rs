use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::descriptor::{ScriptDescriptor, Tier};

/// Membership group of the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UserGroup {
    Registered,
    Banned,
    Vip,
    Sponsor,
    Contributor,
    ScriptWriter,
    Developer,
    Moderator,
    SuperModerator,
    Administrator,
}

impl UserGroup {
    /// Groups allowed to run restricted scripts
    pub const PRIVILEGED: [UserGroup; 8] = [
        UserGroup::Administrator,
        UserGroup::Contributor,
        UserGroup::Developer,
        UserGroup::Moderator,
        UserGroup::SuperModerator,
        UserGroup::Sponsor,
        UserGroup::ScriptWriter,
        UserGroup::Vip,
    ];

    pub fn is_privileged(self) -> bool {
        Self::PRIVILEGED.contains(&self)
    }
}

/// Who is running scripts right now
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    username: Option<String>,
    group: Option<UserGroup>,
}

impl UserSession {
    /// A session with nobody logged in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in user, optionally with a known membership group
    pub fn authenticated(username: impl Into<String>, group: Option<UserGroup>) -> Self {
        Self {
            username: Some(username.into()),
            group,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn group(&self) -> Option<UserGroup> {
        self.group
    }
}

/// Decides whether a script may be started for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorizationGate {
    offline: bool,
}

impl AuthorizationGate {
    pub fn new(offline: bool) -> Self {
        Self { offline }
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn can_run(&self, descriptor: &ScriptDescriptor, user: &UserSession) -> bool {
        if descriptor.tier() == Tier::Free || self.offline || !user.is_authenticated() {
            return true;
        }

        match user.group() {
            Some(UserGroup::Banned) => false,
            Some(group) => descriptor.tier() == Tier::Restricted && group.is_privileged(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREE: ScriptDescriptor = ScriptDescriptor::new("free", Tier::Free, &[]);
    const RESTRICTED: ScriptDescriptor = ScriptDescriptor::new("restricted", Tier::Restricted, &[]);

    fn all_sessions() -> Vec<UserSession> {
        let mut sessions = vec![
            UserSession::anonymous(),
            UserSession::authenticated("nobody", None),
        ];
        for group in [
            UserGroup::Registered,
            UserGroup::Banned,
            UserGroup::Vip,
            UserGroup::Sponsor,
            UserGroup::Contributor,
            UserGroup::ScriptWriter,
            UserGroup::Developer,
            UserGroup::Moderator,
            UserGroup::SuperModerator,
            UserGroup::Administrator,
        ] {
            sessions.push(UserSession::authenticated("user", Some(group)));
        }
        sessions
    }

    #[test]
    fn test_free_scripts_always_run() {
        for gate in [AuthorizationGate::new(false), AuthorizationGate::new(true)] {
            for user in all_sessions() {
                assert!(gate.can_run(&FREE, &user), "denied free script for {:?}", user);
            }
        }
    }

    #[test]
    fn test_restricted_requires_privileged_group() {
        let gate = AuthorizationGate::new(false);

        for user in all_sessions().into_iter().filter(|u| u.is_authenticated()) {
            let expected = user.group().is_some_and(UserGroup::is_privileged);
            assert_eq!(gate.can_run(&RESTRICTED, &user), expected, "{:?}", user);
        }
    }

    #[test]
    fn test_banned_user_is_denied() {
        let gate = AuthorizationGate::new(false);
        let banned = UserSession::authenticated("griefer", Some(UserGroup::Banned));

        assert!(!gate.can_run(&RESTRICTED, &banned));
    }

    #[test]
    fn test_offline_or_anonymous_is_allowed() {
        let banned = UserSession::authenticated("griefer", Some(UserGroup::Banned));
        assert!(AuthorizationGate::new(true).can_run(&RESTRICTED, &banned));
        assert!(AuthorizationGate::new(false).can_run(&RESTRICTED, &UserSession::anonymous()));
    }

    #[test]
    fn test_user_group_parses_kebab_case() {
        let group: UserGroup = toml::Value::from("super-moderator").try_into().unwrap();
        assert_eq!(group, UserGroup::SuperModerator);
        assert_eq!(UserGroup::ScriptWriter.to_string(), "script-writer");
    }
}
