use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Shown when neither a nickname nor an email is available.
pub const UNKNOWN_DISPLAY_NAME: &str = "알 수 없음";

/// Public profile row of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Nickname, else the local part of the email, else [`UNKNOWN_DISPLAY_NAME`].
    pub fn display_name(&self) -> String {
        display_name(Some(self))
    }
}

/// Resolves the name shown next to a seller, tolerating a missing profile.
pub fn display_name(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile else {
        return UNKNOWN_DISPLAY_NAME.to_string();
    };

    if let Some(nickname) = profile.nickname.as_deref().map(str::trim) {
        if !nickname.is_empty() {
            return nickname.to_string();
        }
    }

    profile
        .email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(nickname: Option<&str>, email: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId::from("u1"),
            nickname: nickname.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn nickname_wins() {
        assert_eq!(profile(Some("고구마"), Some("a@b.c")).display_name(), "고구마");
    }

    #[test]
    fn falls_back_to_email_local_part() {
        assert_eq!(profile(None, Some("sweetpotato@example.com")).display_name(), "sweetpotato");
        assert_eq!(profile(Some("  "), Some("kim@example.com")).display_name(), "kim");
    }

    #[test]
    fn unknown_when_nothing_usable() {
        assert_eq!(profile(None, None).display_name(), UNKNOWN_DISPLAY_NAME);
        assert_eq!(profile(None, Some("@example.com")).display_name(), UNKNOWN_DISPLAY_NAME);
        assert_eq!(display_name(None), UNKNOWN_DISPLAY_NAME);
    }
}
