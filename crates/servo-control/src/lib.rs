//! # Servo Control
//!
//! 单轴速度伺服的控制核心：
//!
//! - [`pid`]: 速度环 PID（接受-拒绝式抗饱和、低速禁用）
//! - [`tuning`]: 主机调参命令轮询 + 遥测回送
//! - [`scheduler`]: 固定周期循环执行器
//! - [`config`]: TOML 配置与默认预设
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use servo_control::{ControllerConfig, CyclicScheduler};
//! use servo_driver::{ControlContext, PeriodicTimer, TickCallback};
//! use servo_hal::{LineLink, SimulatedMotor};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::default();
//! let motor = SimulatedMotor::default();
//! let ctx = Arc::new(ControlContext::new(config.reference_velocity));
//!
//! let callbacks: Vec<Arc<dyn TickCallback>> = vec![Arc::new(motor.clone()), ctx.clone()];
//! let _timer = PeriodicTimer::spawn(config.period(), callbacks)?;
//!
//! let mut scheduler =
//!     CyclicScheduler::new(&config, motor.clone(), motor, LineLink::stdio()?, ctx)?;
//! scheduler.run();
//! scheduler.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod pid;
pub mod scheduler;
pub mod tuning;

pub use config::{ControllerConfig, PidConfig, TelemetryConfig};
pub use error::ControlError;
pub use pid::{DEFAULT_DISABLE_THRESHOLD, Gain, Gains, PidController};
pub use scheduler::{CyclicScheduler, LoopConfig};
pub use tuning::{TuningChannel, apply_command};
