//! Role-based visibility rules for retrieved chunks.
//!
//! The mapping from caller role to search filter lives here and nowhere
//! else, so the access boundary can be reviewed in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{AccessLevel, ChunkMetadata};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Advisor,
    Intern,
    /// Any role string the service does not know about.
    Unrecognized(String),
}

impl Role {
    /// Parses any caller-supplied role string. Never fails: unknown values
    /// become `Unrecognized` and are handled by the policy.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "advisor" => Role::Advisor,
            "intern" => Role::Intern,
            _ => Role::Unrecognized(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Advisor => "advisor",
            Role::Intern => "intern",
            Role::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over chunk metadata, pushed down into the vector search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessFilter {
    Unrestricted,
    ExcludeConfidential,
}

impl AccessFilter {
    pub fn permits(&self, metadata: &ChunkMetadata) -> bool {
        self.permits_level(Some(metadata.access_level))
    }

    /// Records with no access tag are treated as public, matching a
    /// `!= confidential` payload condition.
    pub fn permits_level(&self, level: Option<AccessLevel>) -> bool {
        match self {
            AccessFilter::Unrestricted => true,
            AccessFilter::ExcludeConfidential => level != Some(AccessLevel::Confidential),
        }
    }
}

/// Maps roles to filters. Unrecognized roles get the most restrictive
/// filter of any known role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn filter_for(&self, role: &Role) -> AccessFilter {
        match role {
            Role::Advisor => AccessFilter::Unrestricted,
            Role::Intern => AccessFilter::ExcludeConfidential,
            Role::Unrecognized(raw) => {
                log::warn!("Unrecognized role '{}', applying most restrictive access", raw);
                AccessFilter::ExcludeConfidential
            }
        }
    }
}
