//! Idempotency tokens derived from storage event sequencers.
//!
//! Every asynchronous hop (query submission, bulk job submission) gets its
//! own token, derived only from the sequencer of the event that triggered
//! that hop. A redelivered event therefore always produces the same token
//! and the downstream engine deduplicates the request.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Separator placed between repetitions of the marker.
const SEPARATOR: char = '-';

/// Length and shape constraints a downstream engine imposes on its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRules {
    /// How many times the marker is repeated.
    pub repeat: usize,
    /// Minimum accepted token length.
    pub min_len: usize,
    /// Maximum accepted token length.
    pub max_len: usize,
}

impl TokenRules {
    /// Rules for catalog query submissions (32 to 128 characters).
    pub const QUERY: Self = Self {
        repeat: 3,
        min_len: 32,
        max_len: 128,
    };

    /// Rules for bulk job submissions (1 to 64 characters).
    pub const BATCH_JOB: Self = Self {
        repeat: 1,
        min_len: 1,
        max_len: 64,
    };
}

/// Deterministic request token for at-most-once downstream side effects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display)]
#[serde(transparent)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// Derives a token from a sequence marker under the given rules.
    ///
    /// The marker is repeated `rules.repeat` times joined by `-`, then
    /// extended one repetition at a time until `rules.min_len` is met. A
    /// result longer than `rules.max_len` is replaced by the hex encoded
    /// SHA-256 digest of the marker.
    pub fn derive(marker: &str, rules: TokenRules) -> Result<Self> {
        let marker = marker.trim();
        if marker.is_empty() {
            return Err(Error::invalid_input("Sequence marker is empty"));
        }

        let mut token = String::with_capacity(rules.min_len.max(marker.len()));
        for _ in 0..rules.repeat.max(1) {
            push_segment(&mut token, marker);
        }
        while token.len() < rules.min_len {
            push_segment(&mut token, marker);
        }

        if token.len() > rules.max_len {
            token = hex::encode(Sha256::digest(marker.as_bytes()));
        }

        Ok(Self(token))
    }

    /// Token for submitting the eligibility query of a partition event.
    pub fn for_query(marker: &str) -> Result<Self> {
        Self::derive(marker, TokenRules::QUERY)
    }

    /// Token for submitting the bulk job of a manifest event.
    pub fn for_batch_job(marker: &str) -> Result<Self> {
        Self::derive(marker, TokenRules::BATCH_JOB)
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IdempotencyToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn push_segment(token: &mut String, marker: &str) {
    if !token.is_empty() {
        token.push(SEPARATOR);
    }
    token.push_str(marker);
}
