//! 遥测行格式
//!
//! 每个控制周期输出一行：`"<velocity> <position> <actuation>\n"`，
//! 字段顺序固定，以单个空格分隔。

use std::fmt::Write as _;
use std::str::FromStr;

/// 实数格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TelemetryFormat {
    /// Rust 默认的 `f64` Display 格式
    #[default]
    Display,
    /// 固定小数位数（`Fixed(6)` 与 C 的 `%f` 输出一致）
    Fixed(usize),
}

/// 单周期遥测数据
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    /// 测量速度（rad/s）
    pub velocity: f64,
    /// 测量位置（度）
    pub position: f64,
    /// 执行量（带符号百分比）
    pub actuation: f64,
}

impl TelemetryFrame {
    pub fn new(velocity: f64, position: f64, actuation: f64) -> Self {
        Self {
            velocity,
            position,
            actuation,
        }
    }

    /// 格式化为带换行的遥测行
    pub fn to_line(&self, format: TelemetryFormat) -> String {
        let mut line = String::with_capacity(48);
        // 写入 String 不会失败
        let _ = match format {
            TelemetryFormat::Display => writeln!(
                line,
                "{} {} {}",
                self.velocity, self.position, self.actuation
            ),
            TelemetryFormat::Fixed(p) => writeln!(
                line,
                "{:.p$} {:.p$} {:.p$}",
                self.velocity, self.position, self.actuation
            ),
        };
        line
    }

    /// 解析遥测行（主机侧使用）
    ///
    /// 字段数不为 3 或任一字段不是实数时返回 `None`。
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split(' ');
        let velocity = f64::from_str(fields.next()?).ok()?;
        let position = f64::from_str(fields.next()?).ok()?;
        let actuation = f64::from_str(fields.next()?).ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(velocity, position, actuation))
    }
}
