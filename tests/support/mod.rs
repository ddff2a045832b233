#![allow(dead_code)]

mod dirs;
mod http_utils;
mod net;
mod upstream;

pub use dirs::*;
pub use http_utils::*;
pub use net::*;
pub use upstream::*;

use std::net::SocketAddr;

use anyhow::Result;
use tokio::task::JoinHandle;

use uagate::cli::Cli;
use uagate::settings::Settings;

/// Renders a policy file from its three admission parameters.
pub fn policy_toml(denies: &str, allows: &str, redirect_page: Option<&str>) -> String {
    let mut doc = format!("denies = '{denies}'\nallows = '{allows}'\n");
    if let Some(page) = redirect_page {
        doc.push_str(&format!("redirect_page = '{page}'\n"));
    }
    doc
}

pub struct GatewayHarness {
    pub dirs: TestDirs,
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl GatewayHarness {
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

pub struct GatewayHarnessBuilder {
    policy: String,
    upstream: SocketAddr,
    extra_settings: String,
}

impl GatewayHarnessBuilder {
    pub fn new(policy: impl Into<String>, upstream: SocketAddr) -> Self {
        Self {
            policy: policy.into(),
            upstream,
            extra_settings: String::new(),
        }
    }

    pub fn return_param(mut self, param: &str) -> Self {
        self.extra_settings
            .push_str(&format!("return_param = \"{param}\"\n"));
        self
    }

    pub fn client_timeout(mut self, secs: u64) -> Self {
        self.extra_settings
            .push_str(&format!("client_timeout = {secs}\n"));
        self
    }

    pub fn upstream_timeout(mut self, secs: u64) -> Self {
        self.extra_settings
            .push_str(&format!("upstream_timeout = {secs}\n"));
        self
    }

    pub fn max_header_size(mut self, size: usize) -> Self {
        self.extra_settings
            .push_str(&format!("max_header_size = {size}\n"));
        self
    }

    pub fn load_settings(&self, dirs: &TestDirs, listen: SocketAddr) -> Result<Settings> {
        std::fs::write(&dirs.policy_path, &self.policy)?;
        let config = format!(
            "listen = \"{listen}\"\nupstream = \"{}\"\npolicy = \"policy.toml\"\nlog = \"text\"\n{}",
            self.upstream, self.extra_settings
        );
        std::fs::write(&dirs.settings_path, config)?;
        let cli = Cli {
            config: Some(dirs.settings_path.clone()),
            check: false,
        };
        Settings::load(&cli)
    }

    pub async fn start(self) -> Result<GatewayHarness> {
        let dirs = TestDirs::new()?;
        let addr = free_local_addr()?;
        let settings = self.load_settings(&dirs, addr)?;

        let handle = tokio::spawn(async move {
            if let Err(err) = uagate::run(settings).await {
                tracing::error!(error = ?err, "gateway run failed");
            }
        });
        wait_for_listener(addr).await?;

        Ok(GatewayHarness { dirs, addr, handle })
    }
}
