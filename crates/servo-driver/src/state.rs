//! 周期快照
//!
//! 每次控制迭代结束时由主循环发布一份 [`ControlCycle`]，
//! 其他线程通过 `ArcSwap` 无锁读取最新一份。

use crate::{Direction, Duty};
use servo_protocol::TelemetryFrame;

/// 单次控制迭代的结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlCycle {
    /// 迭代序号（从 1 开始；0 表示尚未运行）
    pub index: u64,
    /// 测得角速度（rad/s）
    pub measured_velocity: f64,
    /// 累计位置（度）
    pub measured_position: f64,
    /// 本次迭代使用的参考速度（rad/s）
    pub reference_velocity: f64,
    /// 带符号执行百分比（未钳位，饱和时超出 ±100；占空比按钳位后的值计算）
    pub actuation: f64,
    /// 写入驱动的占空比
    pub duty: Duty,
    /// 编码器方向
    pub direction: Direction,
}

impl ControlCycle {
    /// 转为遥测帧（速度、位置、执行百分比）
    pub fn telemetry(&self) -> TelemetryFrame {
        TelemetryFrame::new(self.measured_velocity, self.measured_position, self.actuation)
    }
}
