//! 周期定时器
//!
//! 用一个专用线程模拟硬件定时器中断：按固定锚点睡眠，每到期一次就依次调用
//! 所有注册的 [`TickCallback`]。回调必须非阻塞，否则会拖慢整条时间线。

use crate::{DriverError, TickCallback};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 周期定时器
///
/// Drop 时自动停止并等待线程退出。
///
/// # 示例
///
/// ```rust,no_run
/// use servo_driver::{ControlContext, PeriodicTimer, TickCallback};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let ctx = Arc::new(ControlContext::new(40.0));
/// let callbacks: Vec<Arc<dyn TickCallback>> = vec![ctx.clone()];
/// let timer = PeriodicTimer::spawn(Duration::from_millis(20), callbacks).unwrap();
///
/// assert!(ctx.wait_tick());
/// drop(timer);
/// ```
pub struct PeriodicTimer {
    period: Duration,
    running: Arc<AtomicBool>,
    fired: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// 启动定时器线程
    ///
    /// # 错误
    ///
    /// - 周期为零：[`DriverError::InvalidPeriod`]
    /// - 线程创建失败：[`DriverError::Io`]
    pub fn spawn(
        period: Duration,
        callbacks: Vec<Arc<dyn TickCallback>>,
    ) -> Result<Self, DriverError> {
        if period.is_zero() {
            return Err(DriverError::InvalidPeriod(period));
        }

        let running = Arc::new(AtomicBool::new(true));
        let fired = Arc::new(AtomicU64::new(0));
        let running_clone = running.clone();
        let fired_clone = fired.clone();

        let handle = thread::Builder::new()
            .name("servo-timer".into())
            .spawn(move || timer_loop(period, callbacks, running_clone, fired_clone))?;

        info!("Periodic timer started: period={:?}", period);

        Ok(Self {
            period,
            running,
            fired,
            handle: Some(handle),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 已到期次数
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 停止并等待线程退出（可重复调用）
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Periodic timer thread panicked");
            }
            info!("Periodic timer stopped after {} ticks", self.fired());
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn timer_loop(
    period: Duration,
    callbacks: Vec<Arc<dyn TickCallback>>,
    running: Arc<AtomicBool>,
    fired: Arc<AtomicU64>,
) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Timer thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set timer thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let mut next_tick = Instant::now() + period;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else if now - next_tick > period {
            // 落后超过一个周期：丢弃积压的到期，重新对齐锚点
            debug!(
                "Timer overrun by {:?}, realigning anchor",
                now.duration_since(next_tick)
            );
            next_tick = now;
        }

        if !running.load(Ordering::Acquire) {
            break;
        }

        for cb in &callbacks {
            cb.on_tick();
        }
        fired.fetch_add(1, Ordering::Relaxed);
        next_tick += period;
    }
}
