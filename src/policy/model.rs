use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// Which configured list a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternList {
    Deny,
    Allow,
}

impl PatternList {
    pub const fn as_str(self) -> &'static str {
        match self {
            PatternList::Deny => "denies",
            PatternList::Allow => "allows",
        }
    }
}

impl fmt::Display for PatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable admission configuration, built once by
/// [`compile_policy`](super::compile::compile_policy) and shared read-only
/// with every request.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub(super) deny_patterns: Arc<[CompiledPattern]>,
    pub(super) allow_patterns: Arc<[CompiledPattern]>,
    pub(super) denied_redirect_target: Option<Arc<str>>,
}

impl PolicyConfig {
    pub fn deny_patterns(&self) -> &[CompiledPattern] {
        &self.deny_patterns
    }

    pub fn allow_patterns(&self) -> &[CompiledPattern] {
        &self.allow_patterns
    }

    pub fn denied_redirect_target(&self) -> Option<&str> {
        self.denied_redirect_target.as_deref()
    }
}

/// A user-agent pattern compiled with whole-value anchoring.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    original: Arc<str>,
}

impl CompiledPattern {
    pub(super) fn new(regex: Regex, original: Arc<str>) -> Self {
        Self { regex, original }
    }

    /// True only when the pattern matches the entire value.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn original(&self) -> &Arc<str> {
        &self.original
    }
}
