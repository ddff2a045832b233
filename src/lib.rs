pub mod cli;
pub mod config;
pub mod logging;
pub mod policy;
pub mod proxy;
pub mod settings;
pub mod util;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::{
    policy::{Admission, matcher::PolicyEvaluator, model::PolicyConfig},
    settings::Settings,
};

pub async fn run(settings: Settings) -> Result<()> {
    let settings = Arc::new(settings);
    let policy = Arc::new(check(&settings)?);
    let denied_redirect_target = policy.denied_redirect_target().map(Arc::<str>::from);
    let admission: Arc<dyn Admission> = Arc::new(PolicyEvaluator::new(policy));

    let app = proxy::AppContext::new(settings, admission, denied_redirect_target);
    proxy::run(app).await
}

/// Loads and compiles the admission policy named by `settings`, failing on the
/// first invalid pattern.
pub fn check(settings: &Settings) -> Result<PolicyConfig> {
    let policy = settings.load_policy()?;
    info!(
        policy = %settings.policy.display(),
        deny_patterns = policy.deny_patterns().len(),
        allow_patterns = policy.allow_patterns().len(),
        redirect = policy.denied_redirect_target(),
        "admission policy loaded"
    );
    Ok(policy)
}
