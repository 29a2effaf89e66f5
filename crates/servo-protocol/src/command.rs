//! 调参命令解析
//!
//! 语法：`<字母><有符号整数>`，字母不区分大小写。
//!
//! | 字母 | 作用                         | 数值换算          |
//! |------|------------------------------|-------------------|
//! | `P`  | 设置 Kp                      | `|n| / 10000`     |
//! | `I`  | 设置 Ki                      | `|n| / 10000`     |
//! | `D`  | 设置 Kd                      | `|n| / 10000`     |
//! | `V`  | 设置参考速度（rad/s）        | `|n|`             |
//!
//! 数值总是取绝对值，因此通过该通道无法设置负增益。
//! 字母与数字之间允许空白，数字之后的多余字符被忽略。
//!
//! # 示例
//!
//! ```
//! use servo_protocol::{TuningKind, parse_command};
//!
//! let cmd = parse_command("p50000").unwrap();
//! assert_eq!(cmd.kind, TuningKind::Kp);
//! assert_eq!(cmd.magnitude, 5.0);
//!
//! let cmd = parse_command("v-30\r\n").unwrap();
//! assert_eq!(cmd.kind, TuningKind::SetpointVelocity);
//! assert_eq!(cmd.magnitude, 30.0);
//!
//! assert!(parse_command("x10").is_err());
//! ```

use crate::ProtocolError;

/// 增益定点缩放系数（主机发送 `gain * 10000` 的整数）
pub const GAIN_SCALE: f64 = 10_000.0;

/// 命令种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TuningKind {
    /// 比例增益
    Kp,
    /// 积分增益
    Ki,
    /// 微分增益
    Kd,
    /// 参考速度
    SetpointVelocity,
}

impl TuningKind {
    /// 从命令字母识别（不区分大小写）
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(Self::Kp),
            'I' => Some(Self::Ki),
            'D' => Some(Self::Kd),
            'V' => Some(Self::SetpointVelocity),
            _ => None,
        }
    }

    /// 对应的大写命令字母
    pub fn letter(self) -> char {
        match self {
            Self::Kp => 'P',
            Self::Ki => 'I',
            Self::Kd => 'D',
            Self::SetpointVelocity => 'V',
        }
    }

    /// 是否为增益命令
    pub fn is_gain(self) -> bool {
        !matches!(self, Self::SetpointVelocity)
    }
}

/// 已解析的调参命令
///
/// 生命周期只在一次 `poll()` 之内：解析、应用、丢弃。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TuningCommand {
    /// 命令种类
    pub kind: TuningKind,
    /// 已换算的非负数值（增益或 rad/s）
    pub magnitude: f64,
}

impl TuningCommand {
    /// 由原始整数构造命令，按种类做绝对值与缩放
    pub fn from_raw(kind: TuningKind, raw: i32) -> Self {
        let abs = f64::from(raw.unsigned_abs());
        let magnitude = if kind.is_gain() { abs / GAIN_SCALE } else { abs };
        Self { kind, magnitude }
    }

    /// 编码为主机侧发送的命令行（不含换行）
    ///
    /// 增益按 `GAIN_SCALE` 截断取整。
    pub fn to_line(&self) -> String {
        let raw = if self.kind.is_gain() {
            (self.magnitude * GAIN_SCALE) as i64
        } else {
            self.magnitude as i64
        };
        format!("{}{}", self.kind.letter(), raw)
    }
}

/// 解析一行调参命令
///
/// 行尾的 `\r`/`\n` 会被去掉。
///
/// # 错误
///
/// - [`ProtocolError::Empty`]: 空行
/// - [`ProtocolError::MissingLetter`]: 首字符不是 ASCII 字母
/// - [`ProtocolError::MalformedNumber`]: 字母后没有整数或整数溢出 `i32`
/// - [`ProtocolError::UnknownCommand`]: 字母不是 `P/I/D/V`
pub fn parse_command(line: &str) -> Result<TuningCommand, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);

    let mut chars = line.chars();
    let letter = chars.next().ok_or(ProtocolError::Empty)?;
    if !letter.is_ascii_alphabetic() {
        return Err(ProtocolError::MissingLetter(letter));
    }

    let raw = parse_leading_int(chars.as_str()).ok_or(ProtocolError::MalformedNumber { letter })?;

    let kind = TuningKind::from_letter(letter).ok_or(ProtocolError::UnknownCommand(letter))?;
    Ok(TuningCommand::from_raw(kind, raw))
}

/// 解析前导整数：跳过空白、可选符号、至少一位数字，之后的字符忽略
fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gains() {
        let cmd = parse_command("p50000").unwrap();
        assert_eq!(cmd.kind, TuningKind::Kp);
        assert!((cmd.magnitude - 5.0).abs() < 1e-12);

        let cmd = parse_command("I12000").unwrap();
        assert_eq!(cmd.kind, TuningKind::Ki);
        assert!((cmd.magnitude - 1.2).abs() < 1e-12);

        let cmd = parse_command("d-125").unwrap();
        assert_eq!(cmd.kind, TuningKind::Kd);
        assert!((cmd.magnitude - 0.0125).abs() < 1e-12);
    }

    #[test]
    fn test_parse_velocity_folds_sign() {
        let cmd = parse_command("v-30").unwrap();
        assert_eq!(cmd.kind, TuningKind::SetpointVelocity);
        assert_eq!(cmd.magnitude, 30.0);

        let cmd = parse_command("V+45\r\n").unwrap();
        assert_eq!(cmd.magnitude, 45.0);
    }

    #[test]
    fn test_parse_unknown_letter() {
        assert_eq!(parse_command("x10"), Err(ProtocolError::UnknownCommand('x')));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_command(""), Err(ProtocolError::Empty));
        assert_eq!(parse_command("\r\n"), Err(ProtocolError::Empty));
        assert_eq!(parse_command(" \n"), Err(ProtocolError::MissingLetter(' ')));
        assert_eq!(parse_command("42"), Err(ProtocolError::MissingLetter('4')));
        assert_eq!(
            parse_command("p"),
            Err(ProtocolError::MalformedNumber { letter: 'p' })
        );
        assert_eq!(
            parse_command("p-"),
            Err(ProtocolError::MalformedNumber { letter: 'p' })
        );
        assert_eq!(
            parse_command("pabc"),
            Err(ProtocolError::MalformedNumber { letter: 'p' })
        );
    }

    #[test]
    fn test_parse_overflow_is_malformed() {
        assert_eq!(
            parse_command("p99999999999"),
            Err(ProtocolError::MalformedNumber { letter: 'p' })
        );
    }

    #[test]
    fn test_parse_i32_min() {
        let cmd = parse_command("v-2147483648").unwrap();
        assert_eq!(cmd.magnitude, 2_147_483_648.0);
    }

    #[test]
    fn test_parse_whitespace_and_trailing() {
        // 字母与数字之间的空白被跳过
        let cmd = parse_command("P 170000").unwrap();
        assert_eq!(cmd.magnitude, 17.0);

        // 小数部分被忽略
        let cmd = parse_command("p12000.5").unwrap();
        assert_eq!(cmd.magnitude, 1.2);
    }

    #[test]
    fn test_to_line() {
        let cmd = TuningCommand {
            kind: TuningKind::Kp,
            magnitude: 17.0,
        };
        assert_eq!(cmd.to_line(), "P170000");

        let cmd = TuningCommand {
            kind: TuningKind::SetpointVelocity,
            magnitude: 40.0,
        };
        assert_eq!(cmd.to_line(), "V40");
    }

    #[test]
    fn test_kind_letters() {
        for kind in [
            TuningKind::Kp,
            TuningKind::Ki,
            TuningKind::Kd,
            TuningKind::SetpointVelocity,
        ] {
            assert_eq!(TuningKind::from_letter(kind.letter()), Some(kind));
            assert_eq!(
                TuningKind::from_letter(kind.letter().to_ascii_lowercase()),
                Some(kind)
            );
        }
        assert_eq!(TuningKind::from_letter('q'), None);
    }

    proptest::proptest! {
        /// 任意整数：增益命令总是得到 |n| / 10000
        #[test]
        fn prop_gain_is_abs_scaled(n in proptest::prelude::any::<i32>()) {
            let cmd = parse_command(&format!("p{n}")).unwrap();
            proptest::prop_assert_eq!(cmd.magnitude, f64::from(n.unsigned_abs()) / GAIN_SCALE);
            proptest::prop_assert!(cmd.magnitude >= 0.0);
        }

        /// 任意输入都不会 panic
        #[test]
        fn prop_parse_never_panics(line in ".{0,16}") {
            let _ = parse_command(&line);
        }
    }
}
