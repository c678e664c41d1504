use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::store::BallotStore;
use super::user::{NewUser, Role, User};
use crate::error::{self, BallotError};

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// The fixed accounts of an election: one admin and `voter_count` numbered voters.
#[derive(Clone, Debug)]
pub struct Roster {
    pub admin_password: String,
    pub voter_password: String,
    pub voter_count: u32,
}

impl Roster {
    pub fn users(&self) -> Vec<NewUser> {
        let admin = NewUser {
            username: "admin".to_owned(),
            password_hash: hash_password(&self.admin_password),
            role: Role::Admin,
        };
        let voter_hash = hash_password(&self.voter_password);
        let voters = (1..=self.voter_count).map(|i| NewUser {
            username: format!("user{i}"),
            password_hash: voter_hash.clone(),
            role: Role::Voter,
        });

        std::iter::once(admin).chain(voters).collect()
    }
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn BallotStore>,
}

impl Accounts {
    pub fn new(store: Arc<dyn BallotStore>) -> Accounts {
        Accounts { store }
    }

    pub fn seed(&self, roster: &Roster) -> Result<usize, BallotError> {
        let inserted = self.store.seed_users(&roster.users())?;
        info!(inserted, voters = roster.voter_count, "user roster seeded");
        Ok(inserted)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<User, BallotError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(error::credentials_missing().into());
        }

        match self.store.find_credentials(username)? {
            Some(credentials) if credentials.password_hash == hash_password(password) => {
                info!(user = %credentials.user.id, role = %credentials.user.role, "login");
                Ok(credentials.user)
            }
            _ => {
                warn!(username, "login rejected");
                Err(BallotError::InvalidCredentials)
            }
        }
    }

    pub fn users_count(&self) -> Result<i64, BallotError> {
        Ok(self.store.count_users()?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::voting::MemoryStore;

    #[fixture]
    fn accounts() -> Accounts {
        let accounts = Accounts::new(Arc::new(MemoryStore::new()));
        accounts
            .seed(&Roster {
                admin_password: "admin123".to_owned(),
                voter_password: "password123".to_owned(),
                voter_count: 3,
            })
            .unwrap();
        accounts
    }

    #[test]
    fn hashes_are_hex_sha256() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn roster_is_seeded_once(accounts: Accounts) {
        assert_eq!(accounts.users_count().unwrap(), 4);
        let roster = Roster {
            admin_password: "other".to_owned(),
            voter_password: "other".to_owned(),
            voter_count: 3,
        };
        assert_eq!(accounts.seed(&roster).unwrap(), 0);
        assert_eq!(accounts.users_count().unwrap(), 4);
    }

    #[rstest]
    #[case("admin", "admin123", Role::Admin)]
    #[case("user2", "password123", Role::Voter)]
    #[case(" user3 ", "password123", Role::Voter)]
    fn seeded_credentials_log_in(
        accounts: Accounts,
        #[case] username: &str,
        #[case] password: &str,
        #[case] role: Role,
    ) {
        let user = accounts.login(username, password).unwrap();
        assert_eq!(user.username, username.trim());
        assert_eq!(user.role, role);
    }

    #[rstest]
    #[case("admin", "password123")]
    #[case("user4", "password123")]
    fn bad_credentials_are_rejected(
        accounts: Accounts,
        #[case] username: &str,
        #[case] password: &str,
    ) {
        assert!(matches!(accounts.login(username, password), Err(BallotError::InvalidCredentials)));
    }

    #[rstest]
    fn blank_credentials_are_a_validation_error(accounts: Accounts) {
        assert!(matches!(accounts.login("", "x"), Err(BallotError::Validation(_))));
        assert!(matches!(accounts.login("admin", ""), Err(BallotError::Validation(_))));
    }
}
