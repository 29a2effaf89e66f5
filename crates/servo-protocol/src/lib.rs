//! # Servo Protocol
//!
//! 主机串口行协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 调参命令解析（`<字母><有符号整数>`）
//! - `telemetry`: 遥测行格式化（`"<速度> <位置> <执行量>\n"`）
//!
//! ## 线路格式
//!
//! 所有报文均为 ASCII 文本行。主机发送 `P125`、`v-30` 之类的命令；
//! 控制器每个控制周期回送一行遥测数据。

pub mod command;
pub mod telemetry;

// 重新导出常用类型
pub use command::{GAIN_SCALE, TuningCommand, TuningKind, parse_command};
pub use telemetry::{TelemetryFormat, TelemetryFrame};

use thiserror::Error;

/// 协议解析错误
///
/// 调参通道对这些错误一律静默忽略，这里保留结构化信息只为日志和指标。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 空行
    #[error("Empty line")]
    Empty,

    /// 首字符不是字母
    #[error("Expected a command letter, found {0:?}")]
    MissingLetter(char),

    /// 字母后没有合法整数
    #[error("Malformed number after command letter '{letter}'")]
    MalformedNumber { letter: char },

    /// 未知命令字母
    #[error("Unknown command letter '{0}'")]
    UnknownCommand(char),
}
