//! # Servo CLI
//!
//! 在模拟电机上运行速度伺服控制循环，标准输入/输出作为主机链路。
//!
//! ```bash
//! # 默认预设（20ms 周期，参考速度 40 rad/s）
//! servo-cli run
//!
//! # 读取配置文件，运行 500 个周期，遥测保留 6 位小数
//! servo-cli run --config servo.toml --cycles 500 --precision 6
//!
//! # 检查配置并打印生效值
//! servo-cli check-config servo.toml
//! ```
//!
//! 运行时从标准输入键入 `P125`、`v60` 等命令即可在线调参；
//! 遥测行写到标准输出，日志写到标准错误。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{CheckConfigCommand, RunCommand};

/// Servo CLI - 单轴速度伺服控制器
#[derive(Parser, Debug)]
#[command(name = "servo-cli")]
#[command(about = "Run the servo control loop against a simulated motor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行控制循环（标准输入/输出为主机链路）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 校验配置文件并打印生效配置
    CheckConfig {
        #[command(flatten)]
        args: CheckConfigCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（写到 stderr，stdout 留给遥测）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("servo_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::CheckConfig { args } => args.execute(),
    }
}
