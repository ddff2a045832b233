mod forward;
pub mod listener;
pub mod policy_eval;
pub mod policy_response;
pub mod request;

use std::sync::Arc;

use anyhow::Result;

use crate::{policy::Admission, settings::Settings};

#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub admission: Arc<dyn Admission>,
    pub denied_redirect_target: Option<Arc<str>>,
}

impl AppContext {
    pub fn new(
        settings: Arc<Settings>,
        admission: Arc<dyn Admission>,
        denied_redirect_target: Option<Arc<str>>,
    ) -> Self {
        Self {
            settings,
            admission,
            denied_redirect_target,
        }
    }
}

pub async fn run(app: AppContext) -> Result<()> {
    listener::start_listener(app).await
}
