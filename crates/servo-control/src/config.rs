//! # 控制器配置
//!
//! 启动时一次性加载，运行期间周期、脉冲数、满量程都不可修改；
//! 增益和参考速度之后仍可通过调参通道改变。
//!
//! ```toml
//! period_ms = 20
//! pulses_per_revolution = 1024
//! max_motor_rpm = 2100.0
//! reference_velocity = 40.0
//!
//! [pid]
//! kp = 17.0
//! ki = 1.2
//! kd = 0.0
//! max_integral = 100.0
//! disable_threshold = 20.0
//!
//! [telemetry]
//! precision = 6
//! ```
//!
//! 文件中缺省的字段取默认值。

use crate::{ControlError, PidController};
use serde::{Deserialize, Serialize};
use servo_driver::ActuationMapper;
use servo_protocol::TelemetryFormat;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// 控制周期（毫秒）
    pub period_ms: u32,

    /// 编码器每转脉冲数
    pub pulses_per_revolution: u32,

    /// 电机最高转速（RPM），作为执行量满量程
    pub max_motor_rpm: f64,

    /// 初始参考速度（rad/s）
    pub reference_velocity: f64,

    /// PID 参数
    pub pid: PidConfig,

    /// 遥测格式
    pub telemetry: TelemetryConfig,
}

/// PID 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// 积分累积上限
    pub max_integral: f64,
    /// 参考速度低于此值时控制器输出 0（rad/s）
    pub disable_threshold: f64,
}

/// 遥测参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// 固定小数位数；缺省时使用默认实数格式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            period_ms: 20,
            pulses_per_revolution: 1024,
            max_motor_rpm: 2100.0,
            reference_velocity: 40.0,
            pid: PidConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 17.0,
            ki: 1.2,
            kd: 0.0,
            max_integral: 100.0,
            disable_threshold: crate::pid::DEFAULT_DISABLE_THRESHOLD,
        }
    }
}

impl TelemetryConfig {
    pub fn format(&self) -> TelemetryFormat {
        match self.precision {
            Some(p) => TelemetryFormat::Fixed(p),
            None => TelemetryFormat::Display,
        }
    }
}

impl ControllerConfig {
    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ControlError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML（用于打印生效配置）
    pub fn to_toml_string(&self) -> Result<String, ControlError> {
        Ok(toml::to_string(self)?)
    }

    /// 校验
    ///
    /// 只拒绝会让换算失去意义的值；增益不做检查。
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.period_ms == 0 {
            return Err(ControlError::Config("period_ms must be > 0".to_string()));
        }
        if self.pulses_per_revolution == 0 {
            return Err(ControlError::Config(
                "pulses_per_revolution must be > 0".to_string(),
            ));
        }
        if !self.max_motor_rpm.is_finite() || self.max_motor_rpm <= 0.0 {
            return Err(ControlError::Config(format!(
                "max_motor_rpm must be finite and > 0, got {}",
                self.max_motor_rpm
            )));
        }
        if !self.reference_velocity.is_finite() {
            return Err(ControlError::Config(format!(
                "reference_velocity must be finite, got {}",
                self.reference_velocity
            )));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(u64::from(self.period_ms))
    }

    /// 按配置构造 PID 控制器
    pub fn pid_controller(&self) -> PidController {
        PidController::new()
            .with_gains(self.pid.kp, self.pid.ki, self.pid.kd)
            .with_max_integral(self.pid.max_integral)
            .with_disable_threshold(self.pid.disable_threshold)
    }

    /// 按配置构造执行量映射器
    pub fn actuation_mapper(&self) -> Result<ActuationMapper, ControlError> {
        Ok(ActuationMapper::from_max_rpm(self.max_motor_rpm)?)
    }
}
