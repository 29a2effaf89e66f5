//! Mock 硬件
//!
//! 用于测试的编码器、驱动和主机链路替身。所有类型都是可克隆的句柄，
//! 测试代码保留一份克隆即可在控制循环运行后检查状态。

use crate::{Channel, DriverSink, Duty, HalError, HostLink, IndexCallback};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

/// Mock 编码器
///
/// 计数器用原子量保存，可以从任意线程注入脉冲。
#[derive(Clone, Default)]
pub struct MockEncoder {
    inner: Arc<MockEncoderInner>,
}

#[derive(Default)]
struct MockEncoderInner {
    count_a: AtomicU16,
    count_b: AtomicU16,
    resets: AtomicU64,
    callback: Mutex<Option<Arc<dyn IndexCallback>>>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接设置两路计数值
    pub fn set_counts(&self, a: u16, b: u16) {
        self.inner.count_a.store(a, Ordering::Relaxed);
        self.inner.count_b.store(b, Ordering::Relaxed);
    }

    /// 累加脉冲（回绕语义与 16 位硬件计数器一致）
    pub fn add_pulses(&self, a: u16, b: u16) {
        self.inner.count_a.fetch_add(a, Ordering::Relaxed);
        self.inner.count_b.fetch_add(b, Ordering::Relaxed);
    }

    /// 模拟零位脉冲中断
    ///
    /// 未注册回调时返回 `false`。
    pub fn fire_index(&self) -> bool {
        let callback = self.inner.callback.lock().clone();
        match callback {
            Some(cb) => {
                cb.on_index_pulse();
                true
            },
            None => false,
        }
    }

    /// `reset_counters()` 被调用的次数
    pub fn reset_count(&self) -> u64 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// 是否已注册零位回调
    pub fn has_index_callback(&self) -> bool {
        self.inner.callback.lock().is_some()
    }
}

impl crate::EncoderSource for MockEncoder {
    fn raw_count(&mut self, channel: Channel) -> u16 {
        match channel {
            Channel::A => self.inner.count_a.load(Ordering::Relaxed),
            Channel::B => self.inner.count_b.load(Ordering::Relaxed),
        }
    }

    fn reset_counters(&mut self) {
        self.inner.count_a.store(0, Ordering::Relaxed);
        self.inner.count_b.store(0, Ordering::Relaxed);
        self.inner.resets.fetch_add(1, Ordering::Relaxed);
    }

    fn set_index_callback(&mut self, callback: Arc<dyn IndexCallback>) {
        *self.inner.callback.lock() = Some(callback);
    }
}

/// 驱动调用记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    Enable,
    Disable,
    SetDuty(Duty),
}

/// Mock 驱动，按顺序记录所有调用
#[derive(Clone, Default)]
pub struct MockDriver {
    events: Arc<Mutex<Vec<DriverEvent>>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部调用记录
    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().clone()
    }

    /// 清空记录
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// 最近一次写入的占空比
    pub fn last_duty(&self) -> Option<Duty> {
        self.events.lock().iter().rev().find_map(|e| match e {
            DriverEvent::SetDuty(d) => Some(*d),
            _ => None,
        })
    }

    /// 依据最后一次 Enable/Disable 判断使能状态
    pub fn is_enabled(&self) -> bool {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|e| match e {
                DriverEvent::Enable => Some(true),
                DriverEvent::Disable => Some(false),
                DriverEvent::SetDuty(_) => None,
            })
            .unwrap_or(false)
    }

    /// 所有写入过的占空比
    pub fn duties(&self) -> Vec<Duty> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DriverEvent::SetDuty(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

impl DriverSink for MockDriver {
    fn enable(&mut self) {
        self.events.lock().push(DriverEvent::Enable);
    }

    fn disable(&mut self) {
        self.events.lock().push(DriverEvent::Disable);
    }

    fn set_duty(&mut self, duty: Duty) {
        self.events.lock().push(DriverEvent::SetDuty(duty));
    }
}

/// 基于通道的主机链路（控制器一端）
pub struct ChannelHostLink {
    rx: Receiver<String>,
    tx: Sender<String>,
}

/// 基于通道的主机链路（主机一端）
pub struct HostEnd {
    tx: Option<Sender<String>>,
    rx: Receiver<String>,
}

impl ChannelHostLink {
    /// 创建一对相连的链路端点
    pub fn pair() -> (ChannelHostLink, HostEnd) {
        let (to_ctrl_tx, to_ctrl_rx) = unbounded();
        let (to_host_tx, to_host_rx) = unbounded();
        (
            ChannelHostLink {
                rx: to_ctrl_rx,
                tx: to_host_tx,
            },
            HostEnd {
                tx: Some(to_ctrl_tx),
                rx: to_host_rx,
            },
        )
    }
}

impl HostLink for ChannelHostLink {
    fn try_read_line(&mut self) -> Result<Option<String>, HalError> {
        match self.rx.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(HalError::Disconnected),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), HalError> {
        self.tx
            .send(line.to_string())
            .map_err(|_| HalError::Disconnected)
    }
}

impl HostEnd {
    /// 向控制器发送一行
    ///
    /// 已调用 [`HostEnd::close`] 时返回 `false`。
    pub fn send_line(&self, line: &str) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(line.to_string()).is_ok())
    }

    /// 关闭发送方向（模拟主机断开输入）
    pub fn close(&mut self) {
        self.tx = None;
    }

    /// 非阻塞接收一行遥测
    pub fn try_recv_line(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// 取出目前收到的全部遥测行
    pub fn drain(&self) -> Vec<String> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncoderSource;
    use std::sync::atomic::AtomicUsize;

    struct CountingCallback(AtomicUsize);

    impl IndexCallback for CountingCallback {
        fn on_index_pulse(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_mock_encoder_counts_and_reset() {
        let mut enc = MockEncoder::new();
        enc.set_counts(10, 7);
        assert_eq!(enc.raw_count(Channel::A), 10);
        assert_eq!(enc.raw_count(Channel::B), 7);

        enc.reset_counters();
        assert_eq!(enc.raw_count(Channel::A), 0);
        assert_eq!(enc.raw_count(Channel::B), 0);
        assert_eq!(enc.reset_count(), 1);
    }

    #[test]
    fn test_mock_encoder_wraps() {
        let mut enc = MockEncoder::new();
        enc.set_counts(u16::MAX, 0);
        enc.add_pulses(2, 0);
        assert_eq!(enc.raw_count(Channel::A), 1);
    }

    #[test]
    fn test_mock_encoder_index_callback() {
        let mut enc = MockEncoder::new();
        assert!(!enc.fire_index());

        let cb = Arc::new(CountingCallback(AtomicUsize::new(0)));
        enc.set_index_callback(cb.clone());
        assert!(enc.has_index_callback());
        assert!(enc.fire_index());
        assert!(enc.fire_index());
        assert_eq!(cb.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_mock_driver_records() {
        let mut drv = MockDriver::new();
        assert!(!drv.is_enabled());
        assert_eq!(drv.last_duty(), None);

        drv.set_duty(Duty::NEUTRAL);
        drv.enable();
        drv.set_duty(Duty::FULL_FORWARD);

        assert!(drv.is_enabled());
        assert_eq!(drv.last_duty(), Some(Duty::FULL_FORWARD));
        assert_eq!(drv.duties(), vec![Duty::NEUTRAL, Duty::FULL_FORWARD]);
        assert_eq!(
            drv.events(),
            vec![
                DriverEvent::SetDuty(Duty::NEUTRAL),
                DriverEvent::Enable,
                DriverEvent::SetDuty(Duty::FULL_FORWARD),
            ]
        );

        drv.disable();
        assert!(!drv.is_enabled());
    }

    #[test]
    fn test_channel_host_link() {
        let (mut link, mut host) = ChannelHostLink::pair();
        assert!(matches!(link.try_read_line(), Ok(None)));

        assert!(host.send_line("p100"));
        assert_eq!(link.try_read_line().unwrap().as_deref(), Some("p100"));

        link.write_line("1 2 3\n").unwrap();
        assert_eq!(host.try_recv_line().as_deref(), Some("1 2 3\n"));

        host.close();
        assert!(!host.send_line("v1"));
        assert!(matches!(link.try_read_line(), Err(HalError::Disconnected)));
    }
}
