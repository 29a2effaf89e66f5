//! check-config 命令

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// 配置检查参数
#[derive(Args, Debug)]
pub struct CheckConfigCommand {
    /// TOML 配置文件
    pub path: PathBuf,
}

impl CheckConfigCommand {
    pub fn execute(&self) -> Result<()> {
        let config = super::load_config(Some(self.path.as_path()))?;
        print!("{}", config.to_toml_string()?);
        eprintln!("✅ {} is valid", self.path.display());
        Ok(())
    }
}
