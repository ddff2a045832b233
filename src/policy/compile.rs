use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::config::PolicyParams;

use super::model::{CompiledPattern, PatternList, PolicyConfig};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{list} pattern #{index} '{pattern}' is not a valid regular expression")]
    InvalidPattern {
        list: PatternList,
        index: usize,
        pattern: Arc<str>,
        #[source]
        source: regex::Error,
    },
    #[error("{list} pattern #{index} is empty")]
    EmptyPattern { list: PatternList, index: usize },
    #[error("redirect target '{target}' must not contain CR or LF characters")]
    InvalidRedirectTarget { target: Arc<str> },
}

/// Builds the immutable [`PolicyConfig`] from raw admission parameters.
///
/// Every pattern is compiled exactly once here, wrapped as
/// `\A(?:pattern)\z` so that evaluation only accepts whole-value matches.
/// The first invalid pattern aborts construction.
pub fn compile_policy(params: &PolicyParams) -> Result<PolicyConfig, PolicyError> {
    let deny_patterns = compile_list(PatternList::Deny, &params.denies)?;
    let allow_patterns = compile_list(PatternList::Allow, &params.allows)?;

    let denied_redirect_target = match params.redirect_page.as_deref() {
        None | Some("") => None,
        Some(target) if target.contains(['\r', '\n']) => {
            return Err(PolicyError::InvalidRedirectTarget {
                target: Arc::from(target),
            });
        }
        Some(target) => Some(Arc::from(target)),
    };

    Ok(PolicyConfig {
        deny_patterns,
        allow_patterns,
        denied_redirect_target,
    })
}

fn compile_list(
    list: PatternList,
    patterns: &[Arc<str>],
) -> Result<Arc<[CompiledPattern]>, PolicyError> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        compiled.push(compile_pattern(list, index, pattern)?);
    }
    Ok(Arc::from(compiled.into_boxed_slice()))
}

fn compile_pattern(
    list: PatternList,
    index: usize,
    pattern: &Arc<str>,
) -> Result<CompiledPattern, PolicyError> {
    if pattern.is_empty() {
        return Err(PolicyError::EmptyPattern { list, index });
    }
    // Validate the pattern on its own first so a stray ')' cannot close the
    // anchoring group and escape it.
    Regex::new(pattern).map_err(|source| PolicyError::InvalidPattern {
        list,
        index,
        pattern: pattern.clone(),
        source,
    })?;
    let anchored = format!(r"\A(?:{pattern})\z");
    let regex = Regex::new(&anchored).map_err(|source| PolicyError::InvalidPattern {
        list,
        index,
        pattern: pattern.clone(),
        source,
    })?;
    Ok(CompiledPattern::new(regex, pattern.clone()))
}
