//! 循环执行器
//!
//! 固定周期的单线程控制循环。每次迭代：
//!
//! 1. 处理上一周期内到达的中断事件（零位脉冲 → 位置清零）
//! 2. 编码器采样（速度、方向、位置），复位计数器
//! 3. PID 计算
//! 4. 执行量映射并写入驱动
//! 5. 轮询一条调参命令
//! 6. 发布周期快照并回送一行遥测
//!
//! 迭代之间忙等定时器置位的 tick 标志。没有超时检测：迭代耗时超过周期时，
//! 下一次等待会直接拿到已置位的标志。

use crate::ControlError;
use crate::config::ControllerConfig;
use crate::pid::PidController;
use crate::tuning::TuningChannel;
use servo_driver::{
    ActuationMapper, Actuator, ControlContext, ControlCycle, ControlEvent, DriverSink,
    EncoderEstimator, EncoderSource, HostLink,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, trace};

/// 循环配置
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// 最大迭代次数（None 表示无限循环）
    ///
    /// 用于测试或定时运行。
    pub max_iterations: Option<u64>,
}

/// 循环执行器
///
/// 独占编码器、驱动和主机链路；与定时器、中断回调之间只通过
/// `Arc<ControlContext>` 交互。
pub struct CyclicScheduler<E, D, L>
where
    E: EncoderSource,
    D: DriverSink,
    L: HostLink,
{
    encoder: E,
    estimator: EncoderEstimator,
    pid: PidController,
    mapper: ActuationMapper,
    actuator: Actuator<D>,
    tuning: TuningChannel<L>,
    ctx: Arc<ControlContext>,
    loop_config: LoopConfig,
    cycles: u64,
}

impl<E, D, L> CyclicScheduler<E, D, L>
where
    E: EncoderSource,
    D: DriverSink,
    L: HostLink,
{
    /// 初始化
    ///
    /// 依次完成：校验配置、把 `ctx` 注册为编码器的零位回调、
    /// 以空挡占空比使能驱动、写入初始参考速度。
    ///
    /// # 错误
    ///
    /// 配置校验失败时返回 [`ControlError::Config`]，此时驱动不会被使能。
    pub fn new(
        config: &ControllerConfig,
        mut encoder: E,
        driver: D,
        link: L,
        ctx: Arc<ControlContext>,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        let estimator = EncoderEstimator::new(config.period_ms, config.pulses_per_revolution)?;
        let mapper = config.actuation_mapper()?;

        encoder.set_index_callback(ctx.clone());

        let mut actuator = Actuator::new(driver);
        actuator.enable();

        ctx.set_reference_velocity(config.reference_velocity);

        info!(
            "Cyclic scheduler ready: period={}ms ppr={} full_scale={:.3}rad/s reference={}",
            config.period_ms,
            config.pulses_per_revolution,
            mapper.full_scale(),
            config.reference_velocity
        );

        Ok(Self {
            encoder,
            estimator,
            pid: config.pid_controller(),
            mapper,
            actuator,
            tuning: TuningChannel::new(link).with_format(config.telemetry.format()),
            ctx,
            loop_config: LoopConfig::default(),
            cycles: 0,
        })
    }

    pub fn with_loop_config(mut self, loop_config: LoopConfig) -> Self {
        self.loop_config = loop_config;
        self
    }

    /// 执行一次迭代（不等待 tick）
    pub fn run_cycle(&mut self) -> ControlCycle {
        let metrics = self.ctx.metrics();

        // 1. 中断事件
        for event in self.ctx.drain_events() {
            match event {
                ControlEvent::IndexPulse => {
                    self.estimator.reset_position();
                    metrics.index_pulses.fetch_add(1, Ordering::Relaxed);
                    trace!("index pulse: position reset");
                },
            }
        }

        // 2. 测量
        let sample = self.estimator.sample(&mut self.encoder);
        let measured_velocity = self.estimator.velocity_rad();
        let measured_position = self.estimator.position_degrees();

        // 3. 控制
        let reference_velocity = self.ctx.reference_velocity();
        let raw = self.pid.update(measured_velocity, reference_velocity);

        // 4. 执行
        let (actuation, duty) = self.mapper.map(raw);
        self.actuator.set_duty(duty);

        // 5. 调参
        self.tuning.poll(&mut self.pid, &self.ctx);

        // 6. 发布 + 遥测
        self.cycles += 1;
        let cycle = ControlCycle {
            index: self.cycles,
            measured_velocity,
            measured_position,
            reference_velocity,
            actuation,
            duty,
            direction: sample.direction,
        };
        self.ctx.publish(cycle);
        self.tuning.emit_telemetry(&cycle.telemetry(), &self.ctx);
        metrics.cycles_total.fetch_add(1, Ordering::Relaxed);

        trace!(
            "cycle {}: v={:.3} ref={} u={:.3} duty={}",
            cycle.index, measured_velocity, reference_velocity, actuation, duty
        );

        cycle
    }

    /// 运行控制循环
    ///
    /// 先立即执行一次迭代，之后每个 tick 执行一次，直到：
    /// - 达到 `max_iterations`（如果设置）
    /// - `ctx.stop()` 被调用
    ///
    /// 返回本次调用执行的迭代数。循环结束时驱动保持使能，由调用方决定是否
    /// [`shutdown`](Self::shutdown)。
    pub fn run(&mut self) -> u64 {
        info!(
            "Control loop started (max_iterations={:?})",
            self.loop_config.max_iterations
        );

        let mut iterations = 0u64;
        while self.ctx.is_running() {
            if let Some(max_iter) = self.loop_config.max_iterations
                && iterations >= max_iter
            {
                break;
            }

            self.run_cycle();
            iterations += 1;

            if self.loop_config.max_iterations == Some(iterations) {
                break;
            }
            if !self.ctx.wait_tick() {
                debug!("Stop requested while waiting for tick");
                break;
            }
        }

        info!("Control loop finished after {} iterations", iterations);
        iterations
    }

    /// 空挡后禁用驱动，返回三个外设
    pub fn shutdown(mut self) -> (E, D, L) {
        self.actuator.disable();
        info!("Cyclic scheduler shut down after {} cycles", self.cycles);
        (self.encoder, self.actuator.into_inner(), self.tuning.into_inner())
    }

    pub fn context(&self) -> &Arc<ControlContext> {
        &self.ctx
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn pid_mut(&mut self) -> &mut PidController {
        &mut self.pid
    }

    pub fn estimator(&self) -> &EncoderEstimator {
        &self.estimator
    }

    pub fn actuator(&self) -> &Actuator<D> {
        &self.actuator
    }

    pub fn tuning(&self) -> &TuningChannel<L> {
        &self.tuning
    }

    /// 已执行的迭代总数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
