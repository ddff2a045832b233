use std::fmt;
use std::sync::Arc;

pub mod compile;
pub mod matcher;
pub mod model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allow,
    Deny,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Allow => "ALLOW",
            Outcome::Deny => "DENY",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of admitting a single request.
///
/// `matched_pattern` is `None` whenever the outcome was reached by a fallback
/// (missing header, or no rule affirmatively deciding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: Outcome,
    pub matched_pattern: Option<Arc<str>>,
    pub request_path: Arc<str>,
}

impl Decision {
    pub fn allow(matched_pattern: Option<Arc<str>>, request_path: &str) -> Self {
        Self {
            outcome: Outcome::Allow,
            matched_pattern,
            request_path: Arc::from(request_path),
        }
    }

    pub fn deny(matched_pattern: Option<Arc<str>>, request_path: &str) -> Self {
        Self {
            outcome: Outcome::Deny,
            matched_pattern,
            request_path: Arc::from(request_path),
        }
    }

    pub fn is_allow(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}

/// Anything that can be asked, per request, whether the client software
/// identified by its `User-Agent` header is admitted.
pub trait Admission: Send + Sync {
    fn admit(&self, user_agent: Option<&str>, request_path: &str) -> Decision;
}
