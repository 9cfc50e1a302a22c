//! Content fingerprints and change detection.
//!
//! The website ingestion path re-scrapes the same page on every refresh. To
//! avoid indexing identical text again, the most recently indexed text is
//! summarized as a SHA-256 [`Fingerprint`] and compared against each new
//! scrape. Only one fingerprint is retained; it is overwritten on every
//! successful re-index and never accumulated as history.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed-width (64 hex chars) SHA-256 digest of a source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint `text`.
    pub fn of(text: &str) -> Self {
        Self(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Wrap a previously stored hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of `new_text` and whether it differs from
/// `previous`. A missing previous fingerprint always counts as changed.
pub fn should_reindex(new_text: &str, previous: Option<&Fingerprint>) -> (Fingerprint, bool) {
    let fingerprint = Fingerprint::of(new_text);
    let changed = previous != Some(&fingerprint);
    (fingerprint, changed)
}

/// The single retained fingerprint plus a version counter bumped on every
/// commit. Owned by the ingestion service, not ambient module state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintState {
    current: Option<Fingerprint>,
    version: u64,
}

impl FingerprintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted fingerprint (version starts at 1).
    pub fn restored(fingerprint: Fingerprint) -> Self {
        Self {
            current: Some(fingerprint),
            version: 1,
        }
    }

    pub fn current(&self) -> Option<&Fingerprint> {
        self.current.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Compare `new_text` against the current fingerprint.
    pub fn check(&self, new_text: &str) -> (Fingerprint, bool) {
        should_reindex(new_text, self.current.as_ref())
    }

    /// Overwrite the retained fingerprint after a successful re-index.
    pub fn commit(&mut self, fingerprint: Fingerprint) {
        self.current = Some(fingerprint);
        self.version += 1;
    }
}
