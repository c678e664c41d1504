use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::UserId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Voter,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Voter => "voter",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "voter" => Ok(Role::Voter),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl User {
    pub const fn new(id: UserId, username: String, role: Role) -> User {
        User {
            id,
            username,
            role,
        }
    }
}

/// A user row together with its stored password digest, only ever read by login.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Account to insert at startup if the username is not taken yet.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("admin", Role::Admin)]
    #[case("voter", Role::Voter)]
    fn role_round_trips_through_its_column_text(#[case] text: &str, #[case] role: Role) {
        assert_eq!(text.parse::<Role>(), Ok(role));
        assert_eq!(role.as_str(), text);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("user".parse::<Role>().is_err());
    }
}
