use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::CandidateId;
use crate::error;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub position: String,
    pub photo_path: Option<String>,
    /// Cached counter; tallies are always recomputed from the vote rows.
    pub votes: i64,
    pub created_at: DateTime<Utc>,
}

/// Candidate fields that passed validation and may be handed to a store.
#[derive(Clone, Debug)]
pub struct CreateCandidate {
    pub name: String,
    pub position: String,
    pub photo_path: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UnvalidatedCreateCandidate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub photo_path: Option<String>,
}

impl TryFrom<UnvalidatedCreateCandidate> for CreateCandidate {
    type Error = error::ValidationError;

    fn try_from(value: UnvalidatedCreateCandidate) -> Result<Self, Self::Error> {
        let UnvalidatedCreateCandidate { name, position, photo_path } = value;

        let name = required(name).ok_or_else(|| error::candidate_field_missing("name"))?;
        let position =
            required(position).ok_or_else(|| error::candidate_field_missing("position"))?;
        let photo_path = photo_path.filter(|path| !path.is_empty());

        Ok(CreateCandidate { name, position, photo_path })
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn unvalidated(name: Option<&str>, position: Option<&str>) -> UnvalidatedCreateCandidate {
        UnvalidatedCreateCandidate {
            name: name.map(String::from),
            position: position.map(String::from),
            photo_path: None,
        }
    }

    #[test]
    fn trims_name_and_position() {
        let candidate =
            CreateCandidate::try_from(unvalidated(Some("  Ada "), Some("President\n"))).unwrap();
        assert_eq!(candidate.name, "Ada");
        assert_eq!(candidate.position, "President");
        assert_eq!(candidate.photo_path, None);
    }

    #[rstest]
    #[case(None, Some("President"), "name")]
    #[case(Some("   "), Some("President"), "name")]
    #[case(Some("Ada"), None, "position")]
    #[case(Some("Ada"), Some(""), "position")]
    fn rejects_missing_fields(
        #[case] name: Option<&str>,
        #[case] position: Option<&str>,
        #[case] field: &str,
    ) {
        let err = CreateCandidate::try_from(unvalidated(name, position)).unwrap_err();
        assert!(err.to_string().contains(field), "unexpected message: {err}");
    }

    #[test]
    fn empty_photo_reference_counts_as_absent() {
        let mut input = unvalidated(Some("Ada"), Some("President"));
        input.photo_path = Some(String::new());
        let candidate = CreateCandidate::try_from(input).unwrap();
        assert_eq!(candidate.photo_path, None);
    }
}
