//! 调参与遥测通道
//!
//! 每个控制周期调用一次 [`TuningChannel::poll`]：最多从主机链路取一行，
//! 解析、应用、丢弃。无法识别的行不改变任何状态，只计入指标。
//! 同一周期末尾调用 [`TuningChannel::emit_telemetry`] 回送一行遥测。

use crate::pid::{Gain, PidController};
use servo_driver::ControlContext;
use servo_hal::{HalError, HostLink};
use servo_protocol::{TelemetryFormat, TelemetryFrame, TuningCommand, TuningKind, parse_command};
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// 调参通道
pub struct TuningChannel<L: HostLink> {
    link: L,
    format: TelemetryFormat,
    /// 输入方向已断开（只记录一次日志）
    input_closed: bool,
}

impl<L: HostLink> TuningChannel<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            format: TelemetryFormat::default(),
            input_closed: false,
        }
    }

    /// 设置遥测实数格式
    pub fn with_format(mut self, format: TelemetryFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> TelemetryFormat {
        self.format
    }

    /// 非阻塞轮询一条命令并应用
    ///
    /// 增益写入 `pid`，参考速度写入 `ctx`。返回已应用的命令；
    /// 没有输入、输入无法识别或链路已断开时返回 `None`。
    pub fn poll(&mut self, pid: &mut PidController, ctx: &ControlContext) -> Option<TuningCommand> {
        if self.input_closed {
            return None;
        }

        let line = match self.link.try_read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(HalError::Disconnected) => {
                info!("Host link input closed, tuning disabled");
                self.input_closed = true;
                return None;
            },
            Err(e) => {
                warn!("Host link read failed: {}", e);
                return None;
            },
        };

        let metrics = ctx.metrics();
        match parse_command(&line) {
            Ok(cmd) => {
                apply_command(cmd, pid, ctx);
                metrics.commands_applied.fetch_add(1, Ordering::Relaxed);
                debug!("Applied tuning command {:?}", cmd);
                Some(cmd)
            },
            Err(e) => {
                metrics.commands_ignored.fetch_add(1, Ordering::Relaxed);
                debug!("Ignoring host line {:?}: {}", line, e);
                None
            },
        }
    }

    /// 回送一行遥测
    ///
    /// 写出失败只记录日志并计数，不中断控制循环。
    pub fn emit_telemetry(&mut self, frame: &TelemetryFrame, ctx: &ControlContext) {
        let line = frame.to_line(self.format);
        if let Err(e) = self.link.write_line(&line) {
            let failures = ctx.metrics().telemetry_errors.fetch_add(1, Ordering::Relaxed);
            // 持续失败时避免刷屏
            if failures == 0 || failures.is_power_of_two() {
                warn!("Telemetry write failed ({} so far): {}", failures + 1, e);
            }
        }
    }

    pub fn is_input_closed(&self) -> bool {
        self.input_closed
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

/// 应用一条已解析的命令
pub fn apply_command(cmd: TuningCommand, pid: &mut PidController, ctx: &ControlContext) {
    match cmd.kind {
        TuningKind::Kp => pid.set_gain(Gain::Kp, cmd.magnitude),
        TuningKind::Ki => pid.set_gain(Gain::Ki, cmd.magnitude),
        TuningKind::Kd => pid.set_gain(Gain::Kd, cmd.magnitude),
        TuningKind::SetpointVelocity => ctx.set_reference_velocity(cmd.magnitude),
    }
}
