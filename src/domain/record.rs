//! Publication and registration records.
//!
//! These are the externally-durable artifacts of a run: what was uploaded to
//! the storage network and what (if anything) was anchored on the ledger.

use serde::{Deserialize, Serialize};

/// A name/value tag attached to every uploaded unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a `name=value` pair (CLI form).
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, value) = raw.split_once('=')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, value))
    }
}

/// Per-file upload location and confirmation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUrl {
    /// Path relative to the published bundle root
    pub path: String,

    /// Resolvable URL for this file
    pub url: String,

    /// Whether the network has fully confirmed this file
    pub confirmed: bool,
}

/// Result of publishing an output directory to the storage network.
///
/// `content_id` is content-derived: the same bytes always produce the same
/// id, so it is the only identifier the ledger may bind to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Content-derived identifier for the whole bundle
    pub content_id: String,

    /// Resolvable URL for the bundle
    pub resolvable_url: String,

    /// Per-file URLs, present only when some files are still propagating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_file_urls: Option<Vec<FileUrl>>,
}

impl PublicationRecord {
    /// Whether some files are still awaiting network confirmation.
    pub fn is_partial(&self) -> bool {
        self.per_file_urls.is_some()
    }
}

/// Outcome of the optional on-ledger registration.
///
/// Absent entirely from a run's result when no ledger credential was
/// supplied. A failed registration never invalidates the publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRegistration {
    pub succeeded: bool,

    /// Transaction signature when the submission was accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Failure reason when the submission was not accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LedgerRegistration {
    pub fn succeeded(signature: String) -> Self {
        Self {
            succeeded: true,
            signature: Some(signature),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            signature: None,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parse() {
        let tag = Tag::parse("Env=production").unwrap();
        assert_eq!(tag.name, "Env");
        assert_eq!(tag.value, "production");

        // Value may contain '='
        let tag = Tag::parse("Query=a=b").unwrap();
        assert_eq!(tag.value, "a=b");

        assert!(Tag::parse("no-separator").is_none());
        assert!(Tag::parse("=empty-name").is_none());
    }

    #[test]
    fn test_partial_publication() {
        let full = PublicationRecord {
            content_id: "abc".to_string(),
            resolvable_url: "https://gw/abc".to_string(),
            per_file_urls: None,
        };
        assert!(!full.is_partial());

        let partial = PublicationRecord {
            per_file_urls: Some(vec![FileUrl {
                path: "index.html".to_string(),
                url: "https://gw/def".to_string(),
                confirmed: false,
            }]),
            ..full
        };
        assert!(partial.is_partial());
    }

    #[test]
    fn test_registration_serialization_omits_absent_fields() {
        let reg = LedgerRegistration::failed("rpc unreachable");
        let json = serde_json::to_string(&reg).unwrap();

        assert!(json.contains("rpc unreachable"));
        assert!(!json.contains("signature"));
    }
}
