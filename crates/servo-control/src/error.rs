//! 控制层错误类型

use servo_driver::DriverError;
use servo_hal::HalError;
use thiserror::Error;

/// 控制层错误
#[derive(Error, Debug)]
pub enum ControlError {
    /// 配置值非法（启动时拒绝）
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 配置文件不是合法 TOML
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置序列化失败
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControlError::Config("period_ms must be > 0".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid configuration: period_ms must be > 0"
        );

        let err = ControlError::from(HalError::Disconnected);
        assert_eq!(format!("{}", err), "HAL error: Link disconnected");

        let err = ControlError::from(DriverError::InvalidInput("x".to_string()));
        assert!(format!("{}", err).starts_with("Driver error:"));
    }
}
