use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

pub struct TestDirs {
    _temp: TempDir,
    pub config_dir: PathBuf,
    pub settings_path: PathBuf,
    pub policy_path: PathBuf,
}

impl TestDirs {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let config_dir = temp.path().join("config");
        std::fs::create_dir_all(&config_dir)?;

        let settings_path = config_dir.join("uagate.toml");
        let policy_path = config_dir.join("policy.toml");

        Ok(Self {
            _temp: temp,
            config_dir,
            settings_path,
            policy_path,
        })
    }
}
