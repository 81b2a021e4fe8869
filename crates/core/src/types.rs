use std::fmt;

use serde::Serialize;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Number of characters in a job identifier.
pub const JOB_ID_LEN: usize = 8;

/// Opaque job identifier: eight lowercase hex characters.
///
/// Identifiers are minted by the service, never accepted from clients as
/// new keys, and double as the base name of the job's output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Mint a fresh identifier from the leading characters of a random UUID.
    ///
    /// Collisions are possible in a 32-bit space; the registry rejects
    /// duplicates and the dispatcher mints again.
    pub fn generate() -> Self {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(JOB_ID_LEN);
        Self(id)
    }

    /// Parse a client-supplied identifier, returning `None` when it does not
    /// belong to the identifier alphabet.
    pub fn parse(raw: &str) -> Option<Self> {
        is_valid_job_id(raw).then(|| Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `raw` is exactly [`JOB_ID_LEN`] lowercase hex characters.
pub fn is_valid_job_id(raw: &str) -> bool {
    raw.len() == JOB_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
