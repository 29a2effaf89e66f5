//! 模拟电机
//!
//! 一阶电机 + 增量编码器模型，同一个句柄同时实现 [`EncoderSource`] 和
//! [`DriverSink`]，用于在没有硬件时闭环运行控制核心。
//!
//! # 模型
//!
//! ```text
//! ω_target = (duty - 50) / 50 * ω_max      （禁用时为 0，电机自由减速）
//! ω       += (ω_target - ω) * min(dt / τ, 1)
//! pulses   = ω * ppr / 2π * dt             （小数部分累积到下一步）
//! ```
//!
//! A 相计数每步加 `|pulses|`；B 相正转时少计 1、反转时多计 1，
//! 使 `A > B` 的方向判定在运动中成立。每跨过一整圈触发一次零位回调。

use crate::{Channel, DriverSink, Duty, EncoderSource, IndexCallback, TickCallback};
use parking_lot::Mutex;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// 模拟参数
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// 每转脉冲数
    pub pulses_per_revolution: u32,
    /// 满占空比时的稳态角速度（rad/s）
    pub max_velocity_rad: f64,
    /// 机械时间常数
    pub time_constant: Duration,
    /// 作为 [`TickCallback`] 时每次推进的时间
    pub tick_period: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pulses_per_revolution: 1024,
            max_velocity_rad: 2100.0 * TAU / 60.0,
            time_constant: Duration::from_millis(300),
            tick_period: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Default)]
struct PlantState {
    enabled: bool,
    duty: Duty,
    velocity_rad: f64,
    count_a: u16,
    count_b: u16,
    pulse_carry: f64,
    angle_pulses: i64,
}

struct SimInner {
    config: SimConfig,
    state: Mutex<PlantState>,
    callback: Mutex<Option<Arc<dyn IndexCallback>>>,
    index_pulses: AtomicU64,
}

/// 模拟电机句柄（可克隆，所有克隆共享同一个物理状态）
#[derive(Clone)]
pub struct SimulatedMotor {
    inner: Arc<SimInner>,
}

impl SimulatedMotor {
    pub fn new(config: SimConfig) -> Self {
        Self {
            inner: Arc::new(SimInner {
                config,
                state: Mutex::new(PlantState::default()),
                callback: Mutex::new(None),
                index_pulses: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.inner.config
    }

    /// 推进物理时间
    pub fn advance(&self, dt: Duration) {
        let cfg = &self.inner.config;
        let dt_sec = dt.as_secs_f64();
        let ppr = i64::from(cfg.pulses_per_revolution.max(1));

        let crossings = {
            let mut s = self.inner.state.lock();

            let target = if s.enabled {
                (f64::from(s.duty.percent()) - 50.0) / 50.0 * cfg.max_velocity_rad
            } else {
                0.0
            };
            let tau = cfg.time_constant.as_secs_f64();
            let alpha = if tau > 0.0 { (dt_sec / tau).min(1.0) } else { 1.0 };
            s.velocity_rad += (target - s.velocity_rad) * alpha;

            let pulses = s.velocity_rad * ppr as f64 / TAU * dt_sec + s.pulse_carry;
            let whole = pulses.trunc();
            s.pulse_carry = pulses - whole;
            let whole = whole as i64;

            // 16 位计数器按硬件语义回绕
            let n = whole.unsigned_abs() as u16;
            if whole > 0 {
                s.count_a = s.count_a.wrapping_add(n);
                s.count_b = s.count_b.wrapping_add(n.wrapping_sub(1));
            } else if whole < 0 {
                s.count_a = s.count_a.wrapping_add(n);
                s.count_b = s.count_b.wrapping_add(n.wrapping_add(1));
            }

            let before = s.angle_pulses.div_euclid(ppr);
            s.angle_pulses += whole;
            let after = s.angle_pulses.div_euclid(ppr);

            trace!(
                "sim: duty={} omega={:.3} pulses={} angle={}",
                s.duty, s.velocity_rad, whole, s.angle_pulses
            );
            (after - before).unsigned_abs()
        };

        if crossings > 0 {
            self.inner.index_pulses.fetch_add(crossings, Ordering::Relaxed);
            let callback = self.inner.callback.lock().clone();
            if let Some(cb) = callback {
                for _ in 0..crossings {
                    cb.on_index_pulse();
                }
            }
        }
    }

    /// 当前角速度（rad/s）
    pub fn velocity_rad(&self) -> f64 {
        self.inner.state.lock().velocity_rad
    }

    /// 当前占空比
    pub fn duty(&self) -> Duty {
        self.inner.state.lock().duty
    }

    /// 驱动是否使能
    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// 累计触发的零位脉冲数
    pub fn index_pulses(&self) -> u64 {
        self.inner.index_pulses.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedMotor {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl EncoderSource for SimulatedMotor {
    fn raw_count(&mut self, channel: Channel) -> u16 {
        let s = self.inner.state.lock();
        match channel {
            Channel::A => s.count_a,
            Channel::B => s.count_b,
        }
    }

    fn reset_counters(&mut self) {
        let mut s = self.inner.state.lock();
        s.count_a = 0;
        s.count_b = 0;
    }

    fn set_index_callback(&mut self, callback: Arc<dyn IndexCallback>) {
        *self.inner.callback.lock() = Some(callback);
    }
}

impl DriverSink for SimulatedMotor {
    fn enable(&mut self) {
        self.inner.state.lock().enabled = true;
    }

    fn disable(&mut self) {
        self.inner.state.lock().enabled = false;
    }

    fn set_duty(&mut self, duty: Duty) {
        self.inner.state.lock().duty = duty;
    }
}

impl TickCallback for SimulatedMotor {
    fn on_tick(&self) {
        self.advance(self.inner.config.tick_period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    impl IndexCallback for Counter {
        fn on_index_pulse(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn run_for(motor: &SimulatedMotor, steps: usize) {
        for _ in 0..steps {
            motor.advance(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_neutral_duty_stays_still() {
        let mut motor = SimulatedMotor::default();
        motor.enable();
        motor.set_duty(Duty::NEUTRAL);
        run_for(&motor, 50);

        assert_eq!(motor.velocity_rad(), 0.0);
        assert_eq!(motor.raw_count(Channel::A), 0);
        assert_eq!(motor.raw_count(Channel::B), 0);
    }

    #[test]
    fn test_forward_direction_a_leads() {
        let mut motor = SimulatedMotor::default();
        motor.enable();
        motor.set_duty(Duty::new(75).unwrap());
        run_for(&motor, 150);

        let half = motor.config().max_velocity_rad / 2.0;
        assert!((motor.velocity_rad() - half).abs() < 1.0);

        motor.reset_counters();
        motor.advance(Duration::from_millis(20));
        assert!(motor.raw_count(Channel::A) > motor.raw_count(Channel::B));
    }

    #[test]
    fn test_reverse_direction_b_leads() {
        let mut motor = SimulatedMotor::default();
        motor.enable();
        motor.set_duty(Duty::new(25).unwrap());
        run_for(&motor, 150);
        assert!(motor.velocity_rad() < 0.0);

        motor.reset_counters();
        motor.advance(Duration::from_millis(20));
        assert!(motor.raw_count(Channel::A) < motor.raw_count(Channel::B));
    }

    #[test]
    fn test_disabled_motor_coasts_down() {
        let mut motor = SimulatedMotor::default();
        motor.enable();
        motor.set_duty(Duty::FULL_FORWARD);
        run_for(&motor, 50);
        assert!(motor.velocity_rad() > 100.0);

        motor.disable();
        run_for(&motor, 300);
        assert!(motor.velocity_rad().abs() < 1e-3);
    }

    #[test]
    fn test_index_pulse_per_revolution() {
        let mut motor = SimulatedMotor::default();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        motor.set_index_callback(counter.clone());
        motor.enable();
        motor.set_duty(Duty::FULL_FORWARD);
        run_for(&motor, 100);

        let fired = counter.0.load(Ordering::Relaxed) as u64;
        assert!(fired > 0);
        assert_eq!(fired, motor.index_pulses());
    }
}
