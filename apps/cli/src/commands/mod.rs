//! 命令定义和实现

pub mod check;
pub mod run;

pub use check::CheckConfigCommand;
pub use run::RunCommand;

use anyhow::{Context, Result};
use servo_control::ControllerConfig;
use std::path::Path;

/// 加载配置：给出路径时读取文件，否则使用默认预设
pub fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    match path {
        Some(path) => ControllerConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ControllerConfig::default()),
    }
}
