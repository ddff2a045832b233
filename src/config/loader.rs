use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::{model::PolicyParams, split_patterns};

const DENIES_KEY: &str = "denies";
const ALLOWS_KEY: &str = "allows";
const REDIRECT_KEYS: [&str; 2] = ["redirect_page", "redirectPage"];

/// Reads admission parameters from a TOML file.
///
/// ```toml
/// denies = ".+IE 5\\.\\d.+,.+IE 6\\.0.+"
/// allows = ""
/// redirect_page = "/unsupported-browser.html"
/// ```
pub fn load_policy_params<P: AsRef<Path>>(path: P) -> Result<PolicyParams> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy config at {}", path.display()))?;
    let doc: PolicyDoc = toml::from_str(&data)
        .with_context(|| format!("failed to parse policy config at {}", path.display()))?;
    Ok(doc.into_params())
}

/// Builds admission parameters from an init-time key/value store.
///
/// Recognised keys are `denies`, `allows` and `redirectPage` (or
/// `redirect_page`). Other keys belong to the host and are ignored; a key
/// given twice keeps its last value.
pub fn policy_params_from_init<I, K, V>(pairs: I) -> PolicyParams
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut params = PolicyParams::default();
    for (key, value) in pairs {
        let key = key.as_ref();
        let value = value.as_ref();
        match key {
            DENIES_KEY => params.denies = split_patterns(value),
            ALLOWS_KEY => params.allows = split_patterns(value),
            _ if REDIRECT_KEYS.contains(&key) => {
                params.redirect_page = Some(Arc::<str>::from(value));
            }
            other => debug!(key = other, "ignoring unrecognised init parameter"),
        }
    }
    params
}

#[derive(Debug, Deserialize)]
struct PolicyDoc {
    #[serde(default)]
    denies: Option<String>,
    #[serde(default)]
    allows: Option<String>,
    #[serde(default, alias = "redirectPage")]
    redirect_page: Option<String>,
}

impl PolicyDoc {
    fn into_params(self) -> PolicyParams {
        let PolicyDoc {
            denies,
            allows,
            redirect_page,
        } = self;
        PolicyParams {
            denies: denies.as_deref().map(split_patterns).unwrap_or_default(),
            allows: allows.as_deref().map(split_patterns).unwrap_or_default(),
            redirect_page: redirect_page.map(Arc::<str>::from),
        }
    }
}
