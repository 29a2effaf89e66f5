//! # Servo HAL
//!
//! 控制核心依赖的三类外部能力的抽象：
//!
//! - [`EncoderSource`]: 正交编码器的原始脉冲计数器 + 零位（Index）脉冲事件
//! - [`DriverSink`]: 双极性 H 桥驱动（使能/禁用/占空比）
//! - [`HostLink`]: 与主机之间的 ASCII 行链路
//!
//! 外设初始化（时钟、引脚复用、定时器/PWM/UART 寄存器）不属于本层。
//!
//! ## 实现
//!
//! - [`sim`]（默认启用）: 一阶电机模型，同时实现编码器与驱动
//! - [`link`]: 基于任意 `BufRead`/`Write` 的行链路（含 stdio）
//! - `mock`（feature `mock`）: 记录调用的测试替身

use std::sync::Arc;
use thiserror::Error;

pub mod link;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use link::{LINE_QUEUE_CAPACITY, LineLink};

#[cfg(feature = "sim")]
pub use sim::{SimConfig, SimulatedMotor};

/// HAL 层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// 对端已关闭（主机断开、读取线程退出）
    #[error("Link disconnected")]
    Disconnected,
}

/// 编码器通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// A 相
    A,
    /// B 相
    B,
}

/// H 桥占空比（百分比）
///
/// 取值保证在 `0..=100`：`0` 全速反转，`50` 空挡，`100` 全速正转。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duty(u8);

impl Duty {
    /// 全速反转
    pub const FULL_REVERSE: Duty = Duty(0);
    /// 空挡（双极性驱动下电机两端平均电压为零）
    pub const NEUTRAL: Duty = Duty(50);
    /// 全速正转
    pub const FULL_FORWARD: Duty = Duty(100);

    /// 创建占空比，超出 100 时截断为 100
    pub const fn saturating(percent: u8) -> Self {
        if percent > 100 { Duty(100) } else { Duty(percent) }
    }

    /// 创建占空比，超出范围返回 `None`
    pub const fn new(percent: u8) -> Option<Self> {
        if percent > 100 { None } else { Some(Duty(percent)) }
    }

    /// 百分比数值
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl Default for Duty {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl std::fmt::Display for Duty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// 零位脉冲回调
///
/// 在"中断上下文"中被调用（编码器的 Index 引脚上升沿）。
///
/// # 性能要求
///
/// - **非阻塞**: 只允许置标志、`try_send` 之类的操作
/// - **无锁**: 禁止 Mutex、I/O、分配
pub trait IndexCallback: Send + Sync {
    /// 检测到零位脉冲
    fn on_index_pulse(&self);
}

/// 周期定时器回调
///
/// 与 [`IndexCallback`] 相同的约束：在定时器"中断"里执行，必须非阻塞。
pub trait TickCallback: Send + Sync {
    /// 定时器到期
    fn on_tick(&self);
}

/// 编码器源
///
/// 两路 16 位硬件计数器分别对 A/B 相脉冲计数。
/// 一个周期内脉冲数超过 `u16::MAX` 时计数器会静默回绕，这是精度上限而不是故障。
pub trait EncoderSource {
    /// 读取自上次复位以来的原始计数
    fn raw_count(&mut self, channel: Channel) -> u16;

    /// 两路计数器清零
    fn reset_counters(&mut self);

    /// 注册零位脉冲回调（替换之前的回调）
    fn set_index_callback(&mut self, callback: Arc<dyn IndexCallback>);
}

/// 驱动输出
///
/// 双极性 H 桥：同一个占空比同时写入互补的两路 PWM 通道。
pub trait DriverSink {
    /// 拉高使能引脚
    fn enable(&mut self);

    /// 拉低使能引脚
    fn disable(&mut self);

    /// 两路通道写入相同占空比
    fn set_duty(&mut self, duty: Duty);
}

/// 主机行链路
pub trait HostLink {
    /// 非阻塞读取一行（不含行尾）
    ///
    /// - `Ok(Some(line))`: 有一整行可用
    /// - `Ok(None)`: 当前没有输入
    /// - `Err(HalError::Disconnected)`: 对端已关闭
    fn try_read_line(&mut self) -> Result<Option<String>, HalError>;

    /// 写出一行（调用方负责行尾）
    fn write_line(&mut self, line: &str) -> Result<(), HalError>;
}

impl<T: EncoderSource + ?Sized> EncoderSource for Box<T> {
    fn raw_count(&mut self, channel: Channel) -> u16 {
        (**self).raw_count(channel)
    }

    fn reset_counters(&mut self) {
        (**self).reset_counters()
    }

    fn set_index_callback(&mut self, callback: Arc<dyn IndexCallback>) {
        (**self).set_index_callback(callback)
    }
}

impl<T: DriverSink + ?Sized> DriverSink for Box<T> {
    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }

    fn set_duty(&mut self, duty: Duty) {
        (**self).set_duty(duty)
    }
}

impl<T: HostLink + ?Sized> HostLink for Box<T> {
    fn try_read_line(&mut self) -> Result<Option<String>, HalError> {
        (**self).try_read_line()
    }

    fn write_line(&mut self, line: &str) -> Result<(), HalError> {
        (**self).write_line(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_bounds() {
        assert_eq!(Duty::new(0), Some(Duty::FULL_REVERSE));
        assert_eq!(Duty::new(50), Some(Duty::NEUTRAL));
        assert_eq!(Duty::new(100), Some(Duty::FULL_FORWARD));
        assert_eq!(Duty::new(101), None);
        assert_eq!(Duty::saturating(250).percent(), 100);
        assert_eq!(Duty::default(), Duty::NEUTRAL);
    }

    #[test]
    fn test_duty_display() {
        assert_eq!(format!("{}", Duty::NEUTRAL), "50%");
    }

    #[test]
    fn test_hal_error_display() {
        assert_eq!(format!("{}", HalError::Disconnected), "Link disconnected");
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let msg = format!("{}", HalError::from(io));
        assert!(msg.contains("IO Error") && msg.contains("pipe"));
    }
}
