//! 执行量映射
//!
//! 控制器输出 → 带符号百分比 `[-100, 100]` → H 桥占空比 `[0, 100]`。
//!
//! ```text
//! reported   = raw * 100 / full_scale                   （遥测上报，不钳位）
//! percentage = clamp(reported, -100, 100)
//! duty       = (trunc(percentage) + 100) / 2            （整数除法，截断不舍入）
//! ```
//!
//! | 百分比 | 占空比 | 含义     |
//! |--------|--------|----------|
//! | -100   | 0      | 全速反转 |
//! | 0      | 50     | 空挡     |
//! | 100    | 100    | 全速正转 |

use crate::DriverError;
use servo_hal::{DriverSink, Duty};
use std::f64::consts::TAU;
use tracing::{debug, info};

/// 缩放并钳位到 `[-100, 100]`
pub fn apply(raw: f64, full_scale: f64) -> f64 {
    (raw * 100.0 / full_scale).clamp(-100.0, 100.0)
}

/// 带符号百分比 → 占空比
///
/// 先向零截断为整数，再钳位，最后做整数除法。截断行为必须保持，
/// 例如 `-99.5` 截断为 `-99`，得到占空比 `0`；`99.9` 截断为 `99`，得到 `99`。
/// NaN 映射为空挡。
pub fn to_driver_command(signed_percentage: f64) -> Duty {
    // `as` 对 NaN 给出 0，对越界值饱和
    let p = (signed_percentage as i32).clamp(-100, 100);
    Duty::saturating(((p + 100) / 2) as u8)
}

/// 执行量映射器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationMapper {
    full_scale: f64,
}

impl ActuationMapper {
    /// 创建映射器
    ///
    /// # 错误
    ///
    /// `full_scale` 非有限或不大于 0 时返回 [`DriverError::InvalidInput`]。
    pub fn new(full_scale: f64) -> Result<Self, DriverError> {
        if !full_scale.is_finite() || full_scale <= 0.0 {
            return Err(DriverError::InvalidInput(format!(
                "full_scale must be finite and > 0, got {}",
                full_scale
            )));
        }
        Ok(Self { full_scale })
    }

    /// 以电机最高转速（RPM）作为满量程，换算为 rad/s
    pub fn from_max_rpm(max_rpm: f64) -> Result<Self, DriverError> {
        Self::new(max_rpm * TAU / 60.0)
    }

    pub fn full_scale(&self) -> f64 {
        self.full_scale
    }

    /// 只缩放不钳位：`raw * 100 / full_scale`
    ///
    /// 遥测上报的就是这个值，饱和时会超出 ±100。
    pub fn scale(&self, raw: f64) -> f64 {
        raw * 100.0 / self.full_scale
    }

    /// 见 [`apply`]
    pub fn apply(&self, raw: f64) -> f64 {
        apply(raw, self.full_scale)
    }

    /// 一步完成：原始输出 → (未钳位百分比, 占空比)
    ///
    /// 钳位只发生在去往驱动的路径上。
    pub fn map(&self, raw: f64) -> (f64, Duty) {
        (self.scale(raw), to_driver_command(self.apply(raw)))
    }
}

/// 带安全规则的驱动包装
///
/// 使能和禁用前都会先写入空挡占空比，避免重新使能瞬间输出极端指令。
#[derive(Debug)]
pub struct Actuator<D: DriverSink> {
    sink: D,
    enabled: bool,
    duty: Duty,
}

impl<D: DriverSink> Actuator<D> {
    /// 包装驱动（不产生任何输出）
    pub fn new(sink: D) -> Self {
        Self {
            sink,
            enabled: false,
            duty: Duty::NEUTRAL,
        }
    }

    /// 空挡后使能
    pub fn enable(&mut self) {
        self.write(Duty::NEUTRAL);
        self.sink.enable();
        self.enabled = true;
        info!("Driver enabled at neutral duty");
    }

    /// 空挡后禁用
    pub fn disable(&mut self) {
        self.write(Duty::NEUTRAL);
        self.sink.disable();
        self.enabled = false;
        info!("Driver disabled");
    }

    /// 写入占空比（两路互补通道相同）
    pub fn set_duty(&mut self, duty: Duty) {
        self.write(duty);
    }

    fn write(&mut self, duty: Duty) {
        if duty != self.duty {
            debug!("duty {} -> {}", self.duty, duty);
        }
        self.sink.set_duty(duty);
        self.duty = duty;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 最近一次写入的占空比
    pub fn duty(&self) -> Duty {
        self.duty
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }

    pub fn into_inner(self) -> D {
        self.sink
    }
}
