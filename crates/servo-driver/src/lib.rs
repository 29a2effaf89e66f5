//! 驱动层模块
//!
//! 本模块提供控制核心与外部能力之间的胶合层，包括：
//! - 控制上下文（原子量共享状态 + 中断事件队列 + ArcSwap 最新周期快照）
//! - 编码器估计（脉冲计数 → 速度/方向/位置）
//! - 执行量映射（控制器输出 → 带符号百分比 → H 桥占空比）
//! - 周期定时器（模拟硬件定时器中断）
//! - 运行指标（原子计数器）
//!
//! # 中断模型
//!
//! 定时器与零位脉冲被建模为"中断"：回调只做置标志或 `try_send`，
//! 所有真正的状态修改都在下一次控制迭代开始时由主循环完成。

pub mod actuation;
pub mod context;
pub mod encoder;
mod error;
pub mod metrics;
pub mod state;
pub mod timer;

pub use actuation::{ActuationMapper, Actuator, apply, to_driver_command};
pub use context::{AtomicF64, ControlContext, ControlEvent, EVENT_QUEUE_CAPACITY};
pub use encoder::{DEFAULT_PULSES_PER_REVOLUTION, Direction, EncoderEstimator, EncoderSample};
pub use error::DriverError;
pub use metrics::{ControlMetrics, MetricsSnapshot};
pub use state::ControlCycle;
pub use timer::PeriodicTimer;

// 重新导出 HAL 类型，方便上层只依赖本 crate
pub use servo_hal::{Channel, DriverSink, Duty, EncoderSource, HostLink, IndexCallback, TickCallback};
