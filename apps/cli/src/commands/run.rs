//! run 命令
//!
//! 模拟电机 + 周期定时器 + stdio 主机链路，运行控制循环直到达到周期数或 Ctrl+C。

use anyhow::{Context, Result};
use clap::Args;
use servo_control::{ControllerConfig, CyclicScheduler, LoopConfig};
use servo_driver::{ControlContext, PeriodicTimer, TickCallback};
use servo_hal::{LineLink, SimConfig, SimulatedMotor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// TOML 配置文件（缺省使用内置预设）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 控制周期（毫秒，覆盖配置）
    #[arg(long)]
    pub period_ms: Option<u32>,

    /// 初始参考速度（rad/s，覆盖配置）
    #[arg(short, long)]
    pub reference: Option<f64>,

    /// 遥测固定小数位数（覆盖配置）
    #[arg(long)]
    pub precision: Option<usize>,

    /// 运行的周期数（缺省一直运行）
    #[arg(short = 'n', long)]
    pub cycles: Option<u64>,

    /// 模拟电机的机械时间常数（毫秒）
    #[arg(long, default_value_t = 300)]
    pub time_constant_ms: u64,
}

impl RunCommand {
    /// 合并配置文件与命令行覆盖项
    pub fn resolve_config(&self) -> Result<ControllerConfig> {
        let mut config = super::load_config(self.config.as_deref())?;

        if let Some(period_ms) = self.period_ms {
            config.period_ms = period_ms;
        }
        if let Some(reference) = self.reference {
            config.reference_velocity = reference;
        }
        if let Some(precision) = self.precision {
            config.telemetry.precision = Some(precision);
        }

        config.validate()?;
        Ok(config)
    }

    /// 模拟电机参数
    pub fn sim_config(&self, config: &ControllerConfig) -> SimConfig {
        SimConfig {
            pulses_per_revolution: config.pulses_per_revolution,
            max_velocity_rad: config.max_motor_rpm * std::f64::consts::TAU / 60.0,
            time_constant: Duration::from_millis(self.time_constant_ms),
            tick_period: config.period(),
        }
    }

    pub fn execute(&self) -> Result<()> {
        let config = self.resolve_config()?;

        let motor = SimulatedMotor::new(self.sim_config(&config));
        let ctx = Arc::new(ControlContext::new(config.reference_velocity));
        let link = LineLink::stdio().context("failed to open stdio host link")?;

        {
            let ctx = ctx.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nReceived interrupt signal. Shutting down...");
                ctx.stop();
            })?;
        }

        let mut scheduler =
            CyclicScheduler::new(&config, motor.clone(), motor.clone(), link, ctx.clone())?
                .with_loop_config(LoopConfig {
                    max_iterations: self.cycles,
                });

        // 先推进电机，再置位 tick，保证每次迭代读到完整一个周期的脉冲
        let callbacks: Vec<Arc<dyn TickCallback>> = vec![Arc::new(motor.clone()), ctx.clone()];
        let mut timer = PeriodicTimer::spawn(config.period(), callbacks)?;

        let iterations = scheduler.run();

        timer.stop();
        scheduler.shutdown();

        let metrics = ctx.metrics().snapshot();
        info!(
            "Ran {} cycles: commands applied={} ignored={}, index pulses={}, dropped events={}, telemetry errors={}",
            iterations,
            metrics.commands_applied,
            metrics.commands_ignored,
            metrics.index_pulses,
            metrics.events_dropped,
            metrics.telemetry_errors
        );
        info!("Final motor velocity: {:.3} rad/s", motor.velocity_rad());

        Ok(())
    }
}
