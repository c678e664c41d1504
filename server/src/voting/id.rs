use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl PartialEq<i32> for $name {
            fn eq(&self, other: &i32) -> bool {
                self.0 == *other
            }
        }
    };
}

row_id! {
    /// Primary key of a seeded user account.
    UserId
}

row_id! {
    /// Primary key of a candidate on the ballot.
    CandidateId
}

row_id! {
    VoteId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&CandidateId(7)).unwrap();
        assert_eq!(json, "7");

        let id: UserId = serde_json::from_str("12").unwrap();
        assert_eq!(id, 12);
    }
}
