//! Thai citizen identifiers.
//!
//! Callers exchange the compact 13-digit form; the record store keeps the
//! hyphenated `d-dddd-ddddd-dd-d` form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digits in a citizen identifier.
pub const CITIZEN_ID_LEN: usize = 13;

/// Length of the hyphenated form.
pub const HYPHENATED_LEN: usize = 17;

/// Hyphenate a compact identifier as `d-dddd-ddddd-dd-d`.
///
/// Precondition: `id13` is exactly 13 ASCII digits. Use [`CitizenId`] to get
/// that guarantee; this function does not check it and panics on shorter input.
pub fn hyphenate(id13: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        &id13[0..1],
        &id13[1..5],
        &id13[5..10],
        &id13[10..12],
        &id13[12..13]
    )
}

/// A validated 13-digit citizen identifier in compact form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CitizenId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("citizen_id must be exactly 13 digits, got '{0}'")]
pub struct InvalidCitizenId(pub String);

impl CitizenId {
    pub fn parse(value: &str) -> Result<Self, InvalidCitizenId> {
        if value.len() == CITIZEN_ID_LEN && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidCitizenId(value.to_string()))
        }
    }

    /// Accept the store's hyphenated form (hyphens at the fixed positions only).
    pub fn from_hyphenated(value: &str) -> Result<Self, InvalidCitizenId> {
        let bytes = value.as_bytes();
        let well_placed = bytes.len() == HYPHENATED_LEN
            && [1, 6, 12, 15].iter().all(|&i| bytes[i] == b'-');
        if !well_placed {
            return Err(InvalidCitizenId(value.to_string()));
        }
        let compact: String = value.chars().filter(|c| *c != '-').collect();
        Self::parse(&compact).map_err(|_| InvalidCitizenId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form stored in the record store's `Citizen ID` column.
    pub fn hyphenated(&self) -> String {
        hyphenate(&self.0)
    }
}

impl FromStr for CitizenId {
    type Err = InvalidCitizenId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CitizenId {
    type Error = InvalidCitizenId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CitizenId> for String {
    fn from(value: CitizenId) -> Self {
        value.0
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
