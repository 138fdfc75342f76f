//! Wire types for the user lookup response.

use std::fmt;

use serde::Deserialize;

/// Top-level response object: a status block and one slot per requested user.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct Envelope {
    /// Call status reported by the API. Informational only.
    #[serde(default)]
    pub status: Option<Status>,
    /// One entry per requested identifier, in request order.
    #[serde(default)]
    pub them: Vec<RemoteEntry>,
}

/// API call status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Status {
    /// Human-readable description, present on failures.
    #[serde(default)]
    pub desc: Option<String>,
    /// Numeric status; `0` means OK.
    #[serde(default)]
    pub code: i64,
    /// Symbolic status name, e.g. `OK` or `INPUT_ERROR`.
    #[serde(default)]
    pub name: Option<String>,
}

impl Status {
    /// Whether the API reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name.as_deref().unwrap_or("UNKNOWN"), self.code)?;
        if let Some(desc) = &self.desc {
            write!(f, ": {desc}")?;
        }
        Ok(())
    }
}

/// A single slot of the `them` array.
///
/// The API encodes "no such user" as `null` in the matching position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<Record>")]
pub enum RemoteEntry {
    /// The user exists. The record may be arbitrarily sparse.
    Present(Box<Record>),
    /// The slot was `null`.
    Absent,
}

impl RemoteEntry {
    /// Returns `true` for [`RemoteEntry::Present`].
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The decoded record, if the slot was not null.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Present(record) => Some(&**record),
            Self::Absent => None,
        }
    }
}

impl From<Option<Record>> for RemoteEntry {
    fn from(slot: Option<Record>) -> Self {
        match slot {
            Some(record) => Self::Present(Box::new(record)),
            None => Self::Absent,
        }
    }
}

/// The fields of a user object this tool understands. Everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Record {
    /// Keybase user id.
    #[serde(default)]
    pub id: Option<String>,
    /// Present when the lookup asked for `fields=basics`.
    #[serde(default)]
    pub basics: Option<Basics>,
    /// Present when the lookup asked for `fields=public_keys`.
    #[serde(default)]
    pub public_keys: Option<PublicKeys>,
}

impl Record {
    /// The primary key's fingerprint, when the user has one.
    #[must_use]
    pub fn primary_fingerprint(&self) -> Option<&str> {
        self.public_keys
            .as_ref()?
            .primary
            .as_ref()?
            .key_fingerprint
            .as_deref()
    }
}

/// Basic identity information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Basics {
    /// Username with its original casing.
    #[serde(default)]
    pub username_cased: Option<String>,
    /// Bumped each time the user's sigchain changes tracking state.
    #[serde(default)]
    pub track_version: Option<u64>,
    /// Per-user salt.
    #[serde(default)]
    pub salt: Option<String>,
}

/// Public key summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct PublicKeys {
    /// The user's primary key.
    #[serde(default)]
    pub primary: Option<Key>,
}

/// A public or private key as described by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Key {
    /// Key id.
    #[serde(default)]
    pub kid: Option<String>,
    /// PGP fingerprint, absent for non-PGP keys.
    #[serde(default)]
    pub key_fingerprint: Option<String>,
    /// `1` for public keys, `2` for private keys.
    #[serde(default)]
    pub key_type: Option<u8>,
}
