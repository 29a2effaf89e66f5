//! 运行指标
//!
//! 所有计数器都是 `AtomicU64`，热路径上只做 `fetch_add(Relaxed)`。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环指标
#[derive(Debug, Default)]
pub struct ControlMetrics {
    /// 已完成的控制迭代数
    pub cycles_total: AtomicU64,
    /// 定时器到期次数
    pub ticks_total: AtomicU64,
    /// 已生效的调参指令
    pub commands_applied: AtomicU64,
    /// 因格式错误或未知字母被忽略的输入行
    pub commands_ignored: AtomicU64,
    /// 已处理的零位脉冲
    pub index_pulses: AtomicU64,
    /// 事件队列已满而丢弃的中断事件
    pub events_dropped: AtomicU64,
    /// 遥测写出失败次数
    pub telemetry_errors: AtomicU64,
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            commands_ignored: self.commands_ignored.load(Ordering::Relaxed),
            index_pulses: self.index_pulses.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            telemetry_errors: self.telemetry_errors.load(Ordering::Relaxed),
        }
    }

    /// 全部清零
    pub fn reset(&self) {
        self.cycles_total.store(0, Ordering::Relaxed);
        self.ticks_total.store(0, Ordering::Relaxed);
        self.commands_applied.store(0, Ordering::Relaxed);
        self.commands_ignored.store(0, Ordering::Relaxed);
        self.index_pulses.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.telemetry_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（普通整数，可自由拷贝比较）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub cycles_total: u64,
    pub ticks_total: u64,
    pub commands_applied: u64,
    pub commands_ignored: u64,
    pub index_pulses: u64,
    pub events_dropped: u64,
    pub telemetry_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let m = ControlMetrics::new();
        m.cycles_total.fetch_add(3, Ordering::Relaxed);
        m.commands_ignored.fetch_add(1, Ordering::Relaxed);
        m.events_dropped.fetch_add(2, Ordering::Relaxed);

        let snap = m.snapshot();
        assert_eq!(snap.cycles_total, 3);
        assert_eq!(snap.commands_ignored, 1);
        assert_eq!(snap.events_dropped, 2);
        assert_eq!(snap.commands_applied, 0);

        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
