//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 线程创建等系统调用失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 定时周期为零
    #[error("Invalid period: {0:?} (must be > 0)")]
    InvalidPeriod(std::time::Duration),

    /// 无效输入（如零脉冲数、非正满量程）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use std::time::Duration;

    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::InvalidPeriod(Duration::ZERO));
        assert!(msg.contains("Invalid period"), "{}", msg);

        let msg = format!("{}", DriverError::InvalidInput("ppr".to_string()));
        assert_eq!(msg, "Invalid input: ppr");

        let io = std::io::Error::other("spawn failed");
        let msg = format!("{}", DriverError::from(io));
        assert!(msg.contains("IO error") && msg.contains("spawn failed"));
    }
}
