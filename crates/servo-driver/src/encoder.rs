//! 编码器估计
//!
//! 每个控制周期读取一次两路原始脉冲计数，换算为速度、方向和累计位置，
//! 然后把硬件计数器清零。
//!
//! # 换算
//!
//! ```text
//! pulses_per_second = 1000 * countA / period_ms        （整数运算）
//! direction         = countA > countB ? +1 : -1        （相等时为 -1）
//! position_accum   += countA                           （不乘方向）
//! ```
//!
//! 方向只是粗略的启发式判断，不是完整的正交解码；位置累计不带方向符号。
//! 计数器在一个周期内超过 `u16::MAX` 时会回绕，超出部分静默丢失。

use crate::DriverError;
use servo_hal::{Channel, EncoderSource};
use std::f64::consts::TAU;
use tracing::trace;

/// 默认每转脉冲数
pub const DEFAULT_PULSES_PER_REVOLUTION: u32 = 1024;

/// 旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum Direction {
    /// 正转（+1）
    Forward = 1,
    /// 反转（-1），也是计数相等时的结果
    #[default]
    Reverse = -1,
}

impl Direction {
    /// 由两路计数判定方向
    pub fn from_counts(count_a: u16, count_b: u16) -> Self {
        if count_a > count_b {
            Self::Forward
        } else {
            Self::Reverse
        }
    }

    /// 符号（+1 / -1）
    pub fn sign(self) -> i8 {
        self as i8
    }
}

/// 单次采样结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSample {
    /// A 相原始计数
    pub count_a: u16,
    /// B 相原始计数
    pub count_b: u16,
    /// 每秒脉冲数
    pub pulses_per_second: u32,
    /// 方向
    pub direction: Direction,
    /// 采样后的累计位置（脉冲）
    pub position_accum: u32,
}

/// 编码器估计器
#[derive(Debug, Clone)]
pub struct EncoderEstimator {
    period_ms: u32,
    pulses_per_revolution: u32,
    pulses_per_second: u32,
    direction: Direction,
    position_accum: u32,
}

impl EncoderEstimator {
    /// 创建估计器
    ///
    /// # 参数
    ///
    /// - `period_ms`: 采样周期（必须与控制周期一致）
    /// - `pulses_per_revolution`: 每转脉冲数
    ///
    /// # 错误
    ///
    /// 任一参数为 0 时返回 [`DriverError::InvalidInput`]。
    pub fn new(period_ms: u32, pulses_per_revolution: u32) -> Result<Self, DriverError> {
        if period_ms == 0 {
            return Err(DriverError::InvalidInput(
                "encoder period_ms must be > 0".to_string(),
            ));
        }
        if pulses_per_revolution == 0 {
            return Err(DriverError::InvalidInput(
                "pulses_per_revolution must be > 0".to_string(),
            ));
        }
        Ok(Self {
            period_ms,
            pulses_per_revolution,
            pulses_per_second: 0,
            direction: Direction::default(),
            position_accum: 0,
        })
    }

    /// 采样并复位硬件计数器
    pub fn sample<E: EncoderSource + ?Sized>(&mut self, source: &mut E) -> EncoderSample {
        // 每路只读一次，速度/方向/位置使用同一组计数
        let count_a = source.raw_count(Channel::A);
        let count_b = source.raw_count(Channel::B);

        self.pulses_per_second = 1000 * u32::from(count_a) / self.period_ms;
        self.direction = Direction::from_counts(count_a, count_b);
        self.position_accum = self.position_accum.wrapping_add(u32::from(count_a));

        source.reset_counters();

        trace!(
            "encoder: a={} b={} pps={} dir={} pos={}",
            count_a,
            count_b,
            self.pulses_per_second,
            self.direction.sign(),
            self.position_accum
        );

        EncoderSample {
            count_a,
            count_b,
            pulses_per_second: self.pulses_per_second,
            direction: self.direction,
            position_accum: self.position_accum,
        }
    }

    /// 零位脉冲：累计位置清零
    pub fn reset_position(&mut self) {
        self.position_accum = 0;
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn pulses_per_revolution(&self) -> u32 {
        self.pulses_per_revolution
    }

    /// 最近一次采样的每秒脉冲数
    pub fn pulses_per_second(&self) -> u32 {
        self.pulses_per_second
    }

    /// 最近一次采样的方向
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 累计位置（脉冲）
    pub fn position_pulses(&self) -> u32 {
        self.position_accum
    }

    /// 累计位置（度）
    pub fn position_degrees(&self) -> f64 {
        pulses_to_degrees(self.position_accum, self.pulses_per_revolution)
    }

    /// 累计位置（弧度）
    pub fn position_radians(&self) -> f64 {
        pulses_to_radians(self.position_accum, self.pulses_per_revolution)
    }

    /// 角速度（rad/s）
    pub fn velocity_rad(&self) -> f64 {
        pps_to_rad_per_sec(self.pulses_per_second, self.pulses_per_revolution)
    }

    /// 转速（RPM）
    pub fn velocity_rpm(&self) -> f64 {
        pps_to_rpm(self.pulses_per_second, self.pulses_per_revolution)
    }
}

/// 脉冲 → 度
pub fn pulses_to_degrees(pulses: u32, pulses_per_revolution: u32) -> f64 {
    360.0 * (f64::from(pulses) / f64::from(pulses_per_revolution))
}

/// 脉冲 → 弧度
pub fn pulses_to_radians(pulses: u32, pulses_per_revolution: u32) -> f64 {
    TAU * (f64::from(pulses) / f64::from(pulses_per_revolution))
}

/// 每秒脉冲 → rad/s
pub fn pps_to_rad_per_sec(pulses_per_second: u32, pulses_per_revolution: u32) -> f64 {
    TAU * (f64::from(pulses_per_second) / f64::from(pulses_per_revolution))
}

/// 每秒脉冲 → RPM
pub fn pps_to_rpm(pulses_per_second: u32, pulses_per_revolution: u32) -> f64 {
    60.0 * (f64::from(pulses_per_second) / f64::from(pulses_per_revolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_hal::mock::MockEncoder;

    fn estimator() -> EncoderEstimator {
        EncoderEstimator::new(20, DEFAULT_PULSES_PER_REVOLUTION).unwrap()
    }

    #[test]
    fn test_new_rejects_zero() {
        assert!(EncoderEstimator::new(0, 1024).is_err());
        assert!(EncoderEstimator::new(20, 0).is_err());
    }

    #[test]
    fn test_sample_velocity_and_reset() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();

        enc.set_counts(100, 99);
        let sample = est.sample(&mut enc);

        // 1000 * 100 / 20 = 5000
        assert_eq!(sample.pulses_per_second, 5000);
        assert_eq!(sample.direction, Direction::Forward);
        assert_eq!(sample.position_accum, 100);
        assert_eq!(enc.reset_count(), 1);

        // 计数器已清零，下一次采样为零
        let sample = est.sample(&mut enc);
        assert_eq!(sample.pulses_per_second, 0);
        assert_eq!(sample.position_accum, 100);
    }

    #[test]
    fn test_pulses_per_second_truncates() {
        let mut enc = MockEncoder::new();
        let mut est = EncoderEstimator::new(30, 1024).unwrap();
        enc.set_counts(7, 0);
        // 7000 / 30 = 233.33 → 233
        assert_eq!(est.sample(&mut enc).pulses_per_second, 233);
    }

    #[test]
    fn test_direction_tie_is_reverse() {
        assert_eq!(Direction::from_counts(5, 5), Direction::Reverse);
        assert_eq!(Direction::from_counts(0, 0), Direction::Reverse);
        assert_eq!(Direction::from_counts(4, 5), Direction::Reverse);
        assert_eq!(Direction::from_counts(6, 5), Direction::Forward);
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Reverse.sign(), -1);
    }

    #[test]
    fn test_position_ignores_direction() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();

        enc.set_counts(10, 20); // 反转
        est.sample(&mut enc);
        enc.set_counts(10, 20);
        let sample = est.sample(&mut enc);

        assert_eq!(sample.direction, Direction::Reverse);
        assert_eq!(sample.position_accum, 20);
    }

    #[test]
    fn test_reset_position() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();
        enc.set_counts(300, 0);
        est.sample(&mut enc);
        assert_eq!(est.position_pulses(), 300);

        est.reset_position();
        assert_eq!(est.position_pulses(), 0);
        assert_eq!(est.position_degrees(), 0.0);
    }

    #[test]
    fn test_position_accum_wraps() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();
        est.position_accum = u32::MAX - 1;
        enc.set_counts(3, 0);
        assert_eq!(est.sample(&mut enc).position_accum, 1);
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(pulses_to_degrees(256, 1024), 90.0);
        assert!((pulses_to_radians(256, 1024) - 1.5708).abs() < 1e-4);
        assert!((pps_to_rad_per_sec(1024, 1024) - TAU).abs() < 1e-12);
        assert_eq!(pps_to_rpm(1024, 1024), 60.0);
    }

    #[test]
    fn test_estimator_conversions() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();
        enc.set_counts(256, 0);
        est.sample(&mut enc);

        assert_eq!(est.position_degrees(), 90.0);
        assert!((est.position_radians() - 1.5708).abs() < 1e-4);
        // 256 脉冲 / 20ms = 12800 pps = 12.5 rev/s
        assert_eq!(est.pulses_per_second(), 12800);
        assert_eq!(est.velocity_rpm(), 750.0);
        assert!((est.velocity_rad() - 12.5 * TAU).abs() < 1e-9);
    }

    #[test]
    fn test_counter_aliasing_is_silent() {
        let mut enc = MockEncoder::new();
        let mut est = estimator();
        // 65536 + 10 个脉冲在 16 位计数器里只剩 10
        enc.set_counts(u16::MAX, 0);
        enc.add_pulses(11, 0);
        assert_eq!(est.sample(&mut enc).count_a, 10);
    }
}
