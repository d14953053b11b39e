//! Choice of the Suno-API base URL.

use super::SunoError;

/// Chooses the Suno-API base URL for the next request.
///
/// Implementations may rotate between deployments; the current one pins the
/// first configured base.
pub trait EndpointSelector: Send + Sync {
    /// Base URL without a trailing slash
    fn base_url(&self) -> &str;
}

/// Always uses the first configured base URL.
#[derive(Debug, Clone)]
pub struct FirstEndpoint {
    base: String,
}

impl FirstEndpoint {
    /// Resolve the first of the configured bases.
    ///
    /// # Errors
    ///
    /// Returns `SunoError::NoEndpoint` if `bases` has no non-empty entry.
    pub fn from_bases(bases: &[String]) -> Result<Self, SunoError> {
        bases
            .iter()
            .map(|b| b.trim().trim_end_matches('/'))
            .find(|b| !b.is_empty())
            .map(|base| Self {
                base: base.to_string(),
            })
            .ok_or(SunoError::NoEndpoint)
    }
}

impl EndpointSelector for FirstEndpoint {
    fn base_url(&self) -> &str {
        &self.base
    }
}
