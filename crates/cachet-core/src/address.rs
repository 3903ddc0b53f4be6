//! Composite address identifying one environment of one project
//!
//! The address tag `projectId|environment` is the replaceable-record key:
//! all envelopes sharing an address compete under last-write-wins. The tag
//! only ever appears inside the encrypted rumor.

use crate::error::{CachetError, CachetResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of "the current secrets" for one environment of one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub project_id: String,
    pub environment: String,
}

impl Address {
    /// Create an address, validating that both sides are non-empty and free
    /// of the `|` separator.
    pub fn new(project_id: impl Into<String>, environment: impl Into<String>) -> CachetResult<Self> {
        let project_id = project_id.into();
        let environment = environment.into();

        if project_id.is_empty() || environment.is_empty() {
            return Err(CachetError::Validation(
                "Address parts must be non-empty".to_string(),
            ));
        }
        if project_id.contains('|') || environment.contains('|') {
            return Err(CachetError::Validation(
                "Address parts must not contain '|'".to_string(),
            ));
        }

        Ok(Self {
            project_id,
            environment,
        })
    }

    /// Strict inverse of [`Address::tag`]. Returns `None` unless the input
    /// contains exactly one `|` with non-empty sides.
    pub fn parse(tag: &str) -> Option<Self> {
        let mut parts = tag.split('|');
        let project_id = parts.next()?;
        let environment = parts.next()?;
        if parts.next().is_some() || project_id.is_empty() || environment.is_empty() {
            return None;
        }
        Some(Self {
            project_id: project_id.to_string(),
            environment: environment.to_string(),
        })
    }

    /// The composite tag value, `projectId|environment`.
    pub fn tag(&self) -> String {
        format!("{}|{}", self.project_id, self.environment)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.project_id, self.environment)
    }
}

impl FromStr for Address {
    type Err = CachetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| CachetError::Validation(format!("Invalid address tag: {}", s)))
    }
}
