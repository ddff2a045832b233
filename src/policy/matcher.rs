use std::sync::Arc;

use super::model::{CompiledPattern, PolicyConfig};
use super::{Admission, Decision};

/// Decides whether a request is admitted based on its `User-Agent` value.
///
/// The evaluation cascade:
/// 1. A missing or empty header is denied; the policy has nothing to match.
/// 2. The first deny pattern that matches the whole value denies the request.
/// 3. The first allow pattern that matches the whole value admits it.
/// 4. With deny rules configured, none matching and no allow list, the request
///    survived every rule and is admitted.
/// 5. Anything else is denied by default.
pub fn evaluate(user_agent: Option<&str>, config: &PolicyConfig, request_path: &str) -> Decision {
    let Some(user_agent) = user_agent.filter(|value| !value.is_empty()) else {
        return Decision::deny(None, request_path);
    };

    if let Some(pattern) = first_match(config.deny_patterns(), user_agent) {
        return Decision::deny(Some(pattern.clone()), request_path);
    }

    if let Some(pattern) = first_match(config.allow_patterns(), user_agent) {
        return Decision::allow(Some(pattern.clone()), request_path);
    }

    if !config.deny_patterns().is_empty() && config.allow_patterns().is_empty() {
        return Decision::allow(None, request_path);
    }

    Decision::deny(None, request_path)
}

fn first_match<'a>(patterns: &'a [CompiledPattern], value: &str) -> Option<&'a Arc<str>> {
    patterns
        .iter()
        .find(|pattern| pattern.matches(value))
        .map(CompiledPattern::original)
}

/// [`Admission`] backed by a shared, immutable [`PolicyConfig`].
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    config: Arc<PolicyConfig>,
}

impl PolicyEvaluator {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

impl Admission for PolicyEvaluator {
    fn admit(&self, user_agent: Option<&str>, request_path: &str) -> Decision {
        evaluate(user_agent, &self.config, request_path)
    }
}
