//! 控制上下文
//!
//! 控制循环与"中断"（定时器、零位脉冲）、调参线程之间共享的全部状态：
//!
//! | 字段          | 写入方           | 读取方       | 机制                   |
//! |---------------|------------------|--------------|------------------------|
//! | tick 标志     | 定时器回调       | 控制循环     | `AtomicBool`           |
//! | 事件队列      | 零位回调         | 控制循环     | 有界 crossbeam 通道    |
//! | 参考速度      | 调参通道/任意线程 | 控制循环     | [`AtomicF64`]          |
//! | 最新周期快照  | 控制循环         | 任意线程     | `ArcSwap`              |
//! | running 标志  | 任意线程         | 控制循环     | `AtomicBool`           |
//!
//! 回调侧只做原子写或 `try_send`，不加锁、不阻塞。

use crate::{ControlCycle, ControlMetrics, IndexCallback, TickCallback};
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use tracing::{trace, warn};

/// 中断事件队列容量
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// 忙等时每自旋多少次让出一次 CPU
const SPINS_PER_YIELD: u32 = 64;

/// 中断事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// 零位脉冲：下一次迭代开始时清零累计位置
    IndexPulse,
}

/// 以位模式存放在 `AtomicU64` 中的 `f64`
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }
}

/// 控制上下文
///
/// 以 `Arc<ControlContext>` 形式在线程间共享，同时实现 [`TickCallback`] 与
/// [`IndexCallback`]，可以直接注册给定时器和编码器。
pub struct ControlContext {
    tick: AtomicBool,
    running: AtomicBool,
    reference_velocity: AtomicF64,
    event_tx: Sender<ControlEvent>,
    event_rx: Receiver<ControlEvent>,
    latest: ArcSwap<ControlCycle>,
    metrics: ControlMetrics,
}

impl ControlContext {
    /// 创建上下文
    ///
    /// # 参数
    ///
    /// - `reference_velocity`: 初始参考速度（rad/s）
    pub fn new(reference_velocity: f64) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        Self {
            tick: AtomicBool::new(false),
            running: AtomicBool::new(true),
            reference_velocity: AtomicF64::new(reference_velocity),
            event_tx,
            event_rx,
            latest: ArcSwap::from_pointee(ControlCycle::default()),
            metrics: ControlMetrics::new(),
        }
    }

    /// 定时器到期：置位 tick 标志
    pub fn signal_tick(&self) {
        self.tick.store(true, Ordering::Release);
        self.metrics.ticks_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取并清除 tick 标志
    ///
    /// 多次到期只记为一次，控制循环落后时不会补跑。
    pub fn take_tick(&self) -> bool {
        self.tick.swap(false, Ordering::AcqRel)
    }

    /// 忙等下一个 tick
    ///
    /// 返回 `true` 表示拿到了 tick；上下文已停止时返回 `false`。
    pub fn wait_tick(&self) -> bool {
        let mut spins = 0u32;
        loop {
            if !self.is_running() {
                return false;
            }
            if self.take_tick() {
                return true;
            }
            spins = spins.wrapping_add(1);
            if spins % SPINS_PER_YIELD == 0 {
                thread::yield_now();
            } else {
                hint::spin_loop();
            }
        }
    }

    /// 零位脉冲：投递事件
    ///
    /// 队列满时丢弃并计数。
    pub fn signal_index_pulse(&self) {
        match self.event_tx.try_send(ControlEvent::IndexPulse) {
            Ok(()) => trace!("index pulse queued"),
            Err(TrySendError::Full(_)) => {
                self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Disconnected(_)) => {
                // 接收端与上下文同生命周期，不会发生
                warn!("Control event queue disconnected");
            },
        }
    }

    /// 取出全部待处理事件
    pub fn drain_events(&self) -> Vec<ControlEvent> {
        self.event_rx.try_iter().collect()
    }

    /// 当前参考速度（rad/s）
    pub fn reference_velocity(&self) -> f64 {
        self.reference_velocity.load(Ordering::Acquire)
    }

    /// 设置参考速度（rad/s），下一次迭代生效
    pub fn set_reference_velocity(&self, value: f64) {
        self.reference_velocity.store(value, Ordering::Release);
    }

    /// 发布最新周期快照
    pub fn publish(&self, cycle: ControlCycle) {
        self.latest.store(Arc::new(cycle));
    }

    /// 最新周期快照（无锁）
    pub fn latest(&self) -> ControlCycle {
        **self.latest.load()
    }

    /// 请求停止：`wait_tick()` 立即返回 `false`
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &ControlMetrics {
        &self.metrics
    }
}

impl Default for ControlContext {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TickCallback for ControlContext {
    fn on_tick(&self) {
        self.signal_tick();
    }
}

impl IndexCallback for ControlContext {
    fn on_index_pulse(&self) {
        self.signal_index_pulse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_atomic_f64() {
        let v = AtomicF64::new(1.5);
        assert_eq!(v.load(Ordering::Relaxed), 1.5);
        v.store(-0.25, Ordering::Relaxed);
        assert_eq!(v.load(Ordering::Relaxed), -0.25);
    }

    #[test]
    fn test_tick_coalesces() {
        let ctx = ControlContext::new(40.0);
        assert!(!ctx.take_tick());

        ctx.on_tick();
        ctx.on_tick();
        assert!(ctx.take_tick());
        assert!(!ctx.take_tick());
        assert_eq!(ctx.metrics().snapshot().ticks_total, 2);
    }

    #[test]
    fn test_index_pulse_queue_overflow() {
        let ctx = ControlContext::default();
        for _ in 0..EVENT_QUEUE_CAPACITY + 3 {
            ctx.on_index_pulse();
        }
        let events = ctx.drain_events();
        assert_eq!(events.len(), EVENT_QUEUE_CAPACITY);
        assert!(events.iter().all(|e| *e == ControlEvent::IndexPulse));
        assert_eq!(ctx.metrics().snapshot().events_dropped, 3);
        assert!(ctx.drain_events().is_empty());
    }

    #[test]
    fn test_reference_velocity() {
        let ctx = ControlContext::new(40.0);
        assert_eq!(ctx.reference_velocity(), 40.0);
        ctx.set_reference_velocity(-12.0);
        assert_eq!(ctx.reference_velocity(), -12.0);
    }

    #[test]
    fn test_publish_latest() {
        let ctx = ControlContext::default();
        assert_eq!(ctx.latest().index, 0);
        ctx.publish(ControlCycle {
            index: 3,
            actuation: 12.0,
            ..Default::default()
        });
        let latest = ctx.latest();
        assert_eq!(latest.index, 3);
        assert_eq!(latest.actuation, 12.0);
    }

    #[test]
    fn test_wait_tick_returns_false_when_stopped() {
        let ctx = ControlContext::default();
        ctx.stop();
        assert!(!ctx.is_running());
        assert!(!ctx.wait_tick());
    }

    #[test]
    fn test_wait_tick_from_other_thread() {
        let ctx = Arc::new(ControlContext::default());
        let ctx2 = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            ctx2.on_tick();
        });
        assert!(ctx.wait_tick());
        handle.join().unwrap();
    }
}
