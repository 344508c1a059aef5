//! Strongly-typed identifiers for Concerto resources.
//!
//! Concerto ids are opaque strings. Wrapping each resource kind in its own
//! type keeps a script id from being interpolated into a server path, and
//! validation on [`parse`](ServerId::parse) and on deserialization keeps ids
//! from smuggling extra path segments into a request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Checks that `input` can be interpolated into a request path as one segment.
///
/// # Errors
///
/// Returns [`Error::InvalidId`] for empty strings and strings containing
/// `/`, `?`, `#` or whitespace.
pub fn validate_id(input: &str) -> Result<&str> {
    if input.is_empty()
        || input
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
    {
        return Err(Error::InvalidId(input.to_string()));
    }
    Ok(input)
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and validates an id.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is not usable as a path segment.
            pub fn parse(input: &str) -> Result<Self> {
                validate_id(input).map(|id| Self(id.to_string()))
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts into the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                validate_id(&value)?;
                Ok(Self(value))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(ServerId, "Cloud server id");
id_type!(PlanId, "Server plan id");
id_type!(VolumeId, "Storage volume id");
id_type!(ScriptId, "Blueprint script id");
id_type!(AttachmentId, "Script attachment id");
id_type!(CookbookVersionId, "Cookbook version id");
id_type!(CommandId, "Polled command id");

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ID: &str = "5b5aa3ec7aa4af26c7b00de7";

    #[test]
    fn test_parse_valid() {
        let id = ServerId::parse(VALID_ID).unwrap();
        assert_eq!(id.as_str(), VALID_ID);
        assert_eq!(id.to_string(), VALID_ID);
    }

    #[test]
    fn test_parse_rejects_path_segments() {
        for bad in ["", "a/b", "a?b=c", "a#b", "a b"] {
            let err = VolumeId::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidId(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_from_str() {
        let id: ScriptId = VALID_ID.parse().unwrap();
        assert_eq!(id.into_string(), VALID_ID);
    }

    #[test]
    fn test_deserialize_validates() {
        for bad in [r#""""#, r#""a/b""#, r#""../x""#, r#""a b""#] {
            assert!(serde_json::from_str::<ServerId>(bad).is_err(), "accepted {bad}");
        }

        let err = serde_json::from_str::<ServerId>(r#""a/b""#).unwrap_err();
        assert!(err.to_string().contains("Invalid id: a/b"));
    }

    #[test]
    fn test_serde_round_trip() {
        let id = AttachmentId::parse(VALID_ID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{VALID_ID}\""));

        let back: AttachmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CommandId::parse("a1").unwrap());
        set.insert(CommandId::parse("a2").unwrap());
        set.insert(CommandId::parse("a1").unwrap());
        assert_eq!(set.len(), 2);
    }
}
