//! Core lookup-and-classify logic against the Keybase user lookup API.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;

use crate::query::{self, LookupKind};
use crate::response::{Envelope, RemoteEntry, Status};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The outcome of a lookup: every requested identifier lands in exactly one
/// of the two sequences, each kept in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Classification {
    found: Vec<String>,
    not_found: Vec<String>,
}

impl Classification {
    /// Identifiers whose response slot held an object.
    #[must_use]
    pub fn found(&self) -> &[String] {
        &self.found
    }

    /// Identifiers whose response slot was `null`.
    #[must_use]
    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    /// Returns `true` when nothing is missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.not_found.is_empty()
    }

    /// Split into `(found, not_found)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.found, self.not_found)
    }

    /// Turn a classification with missing identifiers into
    /// [`LookupError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] if any identifier was not found.
    pub fn into_result(self, kind: LookupKind) -> Result<Self, LookupError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(LookupError::NotFound(NotFoundError {
                kind,
                classification: self,
            }))
        }
    }
}

/// Some identifiers were missing from the response.
///
/// This is an expected outcome rather than a failure of the call: the
/// partial [`Classification`] is carried along and the found identifiers
/// are still valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    kind: LookupKind,
    classification: Classification,
}

impl NotFoundError {
    /// The kind of lookup that came back incomplete.
    #[must_use]
    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    /// Identifiers that were found.
    #[must_use]
    pub fn found(&self) -> &[String] {
        self.classification.found()
    }

    /// Identifiers that were not found. Never empty.
    #[must_use]
    pub fn not_found(&self) -> &[String] {
        self.classification.not_found()
    }

    /// The full partial result.
    pub fn into_classification(self) -> Classification {
        self.classification
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self.not_found().join(" ");
        match self.kind {
            LookupKind::Identity => write!(f, "user(s) [{missing}] not found"),
            LookupKind::PublicKey => write!(f, "public key for user(s) [{missing}] not found"),
        }
    }
}

impl std::error::Error for NotFoundError {}

/// The response body did not have the expected shape.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The body is not valid JSON, or an entry is neither an object nor `null`.
    Json(serde_json::Error),
    /// The `them` array does not have one slot per requested identifier.
    LengthMismatch {
        /// Number of identifiers requested.
        expected: usize,
        /// Number of slots in the response.
        actual: usize,
        /// The envelope's status, when the API reported something other than OK.
        status: Option<Status>,
    },
}

impl DecodeError {
    /// Attach the envelope status to a length mismatch, if it isn't OK.
    fn with_status(self, envelope_status: Option<&Status>) -> Self {
        match self {
            Self::LengthMismatch {
                expected,
                actual,
                status: None,
            } => Self::LengthMismatch {
                expected,
                actual,
                status: envelope_status.filter(|s| !s.is_ok()).cloned(),
            },
            other => other,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed response: {e}"),
            Self::LengthMismatch {
                expected,
                actual,
                status,
            } => {
                write!(
                    f,
                    "response has {actual} entries for {expected} requested user(s)"
                )?;
                if let Some(status) = status {
                    write!(f, " (API status: {status})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::LengthMismatch { .. } => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Errors that can occur during a lookup.
///
/// Implements [`std::error::Error`] with [`source`](std::error::Error::source)
/// chaining. Only [`Transport`](Self::Transport) and [`Decode`](Self::Decode)
/// mean the call itself failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum LookupError {
    /// The API could not be reached or the body could not be read.
    Transport(Box<ureq::Error>),
    /// The body could not be decoded into a lookup response.
    Decode(DecodeError),
    /// One or more identifiers do not exist. Carries the partial result.
    NotFound(NotFoundError),
}

impl LookupError {
    /// The partial result, if this is [`LookupError::NotFound`].
    #[must_use]
    pub fn as_not_found(&self) -> Option<&NotFoundError> {
        match self {
            Self::NotFound(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "request failed: {e}"),
            Self::Decode(e) => write!(f, "{e}"),
            Self::NotFound(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e.as_ref()),
            Self::Decode(e) => Some(e),
            Self::NotFound(e) => Some(e),
        }
    }
}

impl From<ureq::Error> for LookupError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}

impl From<DecodeError> for LookupError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

/// An HTTP client configured for Keybase API queries.
///
/// Wraps the underlying HTTP agent so callers don't depend on the HTTP
/// library version, and remembers which API base to target.
///
/// # Example
///
/// ```no_run
/// use keybasectl::lookup::Client;
///
/// let prod = Client::new();
/// let local = Client::with_base_url("http://127.0.0.1:8080");
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
    base_url: String,
}

impl Client {
    /// Create a client for the production API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(query::DEFAULT_API_BASE)
    }

    /// Create a client targeting a different API base, e.g. a staging host.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            // Error responses still carry an envelope worth decoding
            .http_status_as_error(false)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.into(),
        }
    }

    /// The API base this client targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch(&self, url: &str) -> Result<String, LookupError> {
        let mut response = self.agent.get(url).call()?;
        debug!(status = response.status().as_u16(), "response status");
        let body = response.body_mut().read_to_string()?;
        Ok(body)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a lookup response body.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] if the body isn't a lookup envelope.
pub fn decode_envelope(body: &str) -> Result<Envelope, DecodeError> {
    Ok(serde_json::from_str(body)?)
}

/// Pair each response slot with the identifier at the same position.
///
/// A slot holding any object, even `{}`, means found; `null` means not found.
///
/// # Errors
///
/// Returns [`DecodeError::LengthMismatch`] unless there is exactly one slot
/// per identifier.
pub fn classify<S: AsRef<str>>(
    identifiers: &[S],
    entries: &[RemoteEntry],
) -> Result<Classification, DecodeError> {
    if entries.len() != identifiers.len() {
        return Err(DecodeError::LengthMismatch {
            expected: identifiers.len(),
            actual: entries.len(),
            status: None,
        });
    }

    let mut classification = Classification::default();
    for (id, entry) in identifiers.iter().zip(entries) {
        let id = id.as_ref();
        match entry {
            RemoteEntry::Present(record) => {
                debug!(
                    user = id,
                    username_cased = record.basics.as_ref().and_then(|b| b.username_cased.as_deref()),
                    fingerprint = record.primary_fingerprint(),
                    "found"
                );
                classification.found.push(id.to_owned());
            }
            RemoteEntry::Absent => {
                debug!(user = id, "not found");
                classification.not_found.push(id.to_owned());
            }
        }
    }
    Ok(classification)
}

/// Look up a batch of identifiers with a single request.
///
/// 1. Builds the query URL for `kind` against the client's API base.
/// 2. Issues one GET and reads the whole body.
/// 3. Decodes the envelope and classifies each identifier by position.
///
/// An empty batch returns an empty [`Classification`] without touching the
/// network.
///
/// # Errors
///
/// - [`LookupError::Transport`] if the request or body read fails.
/// - [`LookupError::Decode`] if the body isn't a well-formed response for
///   this batch.
/// - [`LookupError::NotFound`] if any identifier is missing; the partial
///   result is available on the error.
///
/// # Example
///
/// ```no_run
/// use keybasectl::lookup::{Client, LookupError, lookup};
/// use keybasectl::query::LookupKind;
///
/// let client = Client::new();
/// match lookup(&client, &["chris", "max"], LookupKind::Identity) {
///     Ok(c) => println!("all found: {:?}", c.found()),
///     Err(LookupError::NotFound(e)) => println!("missing: {:?}", e.not_found()),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// ```
pub fn lookup<S: AsRef<str>>(
    client: &Client,
    identifiers: &[S],
    kind: LookupKind,
) -> Result<Classification, LookupError> {
    if identifiers.is_empty() {
        debug!(%kind, "empty lookup, skipping request");
        return Ok(Classification::default());
    }

    let url = query::build_with_base(&client.base_url, identifiers, kind);
    debug!(%url, "targeting keybase API");

    let body = client.fetch(&url)?;
    debug!(bytes = body.len(), "response received");

    let envelope = decode_envelope(&body)?;
    if let Some(status) = envelope.status.as_ref().filter(|s| !s.is_ok()) {
        warn!(
            code = status.code,
            name = status.name.as_deref(),
            desc = status.desc.as_deref(),
            "keybase API reported a non-OK status"
        );
    }

    classify(identifiers, &envelope.them)
        .map_err(|e| e.with_status(envelope.status.as_ref()))?
        .into_result(kind)
}

/// Look up whether each user exists.
///
/// # Errors
///
/// See [`lookup`].
pub fn user_lookup<S: AsRef<str>>(
    client: &Client,
    identifiers: &[S],
) -> Result<Classification, LookupError> {
    lookup(client, identifiers, LookupKind::Identity)
}

/// Look up whether each user has public key data.
///
/// # Errors
///
/// See [`lookup`].
pub fn pub_key_lookup<S: AsRef<str>>(
    client: &Client,
    identifiers: &[S],
) -> Result<Classification, LookupError> {
    lookup(client, identifiers, LookupKind::PublicKey)
}
