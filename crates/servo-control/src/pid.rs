//! PID Controller - 速度环比例-积分-微分控制器
//!
//! # 算法
//!
//! ```text
//! error      = reference - measurement
//! output     = Kp * error + Ki * Σerror + Kd * (prev_measurement - measurement)
//! ```
//!
//! 与教科书 PID 的几点差别：
//!
//! - **无 dt**: 积分和微分都按"每周期"计算，增益已经吸收了固定周期
//! - **微分作用在测量值上**: 参考值跳变不会产生微分冲击
//! - **接受-拒绝式抗饱和**: 累加后的积分若 `|Σ| >= max_integral`，
//!   本次累加整体丢弃，积分保持上一次的值（不是钳位到边界）
//! - **低速禁用**: `reference < disable_threshold` 时直接输出 0，
//!   积分和上一次测量值都不更新
//! - **输出不限幅**: 限幅由执行量映射负责
//!
//! # 示例
//!
//! ```rust
//! use servo_control::PidController;
//!
//! let mut pid = PidController::new()
//!     .with_gains(17.0, 1.2, 0.0)
//!     .with_max_integral(100.0);
//!
//! let output = pid.update(0.0, 40.0);
//! assert!((output - 728.0).abs() < 1e-9);
//! ```

use tracing::trace;

/// 默认禁用阈值（rad/s）
pub const DEFAULT_DISABLE_THRESHOLD: f64 = 20.0;

/// 增益选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gain {
    Kp,
    Ki,
    Kd,
}

/// 三个增益的快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// PID 控制器
#[derive(Debug, Clone)]
pub struct PidController {
    /// 比例增益 (Kp)
    kp: f64,

    /// 积分增益 (Ki)
    ki: f64,

    /// 微分增益 (Kd)
    kd: f64,

    /// 误差累积值
    integral_sum: f64,

    /// 上一次的测量值（用于计算微分）
    previous_measurement: f64,

    /// 积分累积上限（开区间）
    max_integral: f64,

    /// 参考值低于此阈值时控制器输出 0
    disable_threshold: f64,
}

impl PidController {
    /// 创建新的 PID 控制器
    ///
    /// # 默认参数
    ///
    /// - Kp = Ki = Kd = 0.0（需要手动设置）
    /// - 积分上限 = 0.0（此时任何累加都会被拒绝）
    /// - 禁用阈值 = [`DEFAULT_DISABLE_THRESHOLD`]
    pub fn new() -> Self {
        PidController {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral_sum: 0.0,
            previous_measurement: 0.0,
            max_integral: 0.0,
            disable_threshold: DEFAULT_DISABLE_THRESHOLD,
        }
    }

    /// 设置 PID 增益
    ///
    /// # 示例
    ///
    /// ```rust
    /// # use servo_control::PidController;
    /// let pid = PidController::new().with_gains(17.0, 1.2, 0.0);
    /// assert_eq!(pid.gains().kp, 17.0);
    /// ```
    pub fn with_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// 设置积分累积上限
    pub fn with_max_integral(mut self, max_integral: f64) -> Self {
        self.max_integral = max_integral;
        self
    }

    /// 设置禁用阈值
    pub fn with_disable_threshold(mut self, threshold: f64) -> Self {
        self.disable_threshold = threshold;
        self
    }

    /// 完全重置：增益、积分、上一次测量值、积分上限全部清零
    ///
    /// 禁用阈值不受影响。
    pub fn reset(&mut self) {
        self.kp = 0.0;
        self.ki = 0.0;
        self.kd = 0.0;
        self.integral_sum = 0.0;
        self.previous_measurement = 0.0;
        self.max_integral = 0.0;
    }

    /// 修改单个增益
    ///
    /// 不做检查：负增益会被接受并翻转对应项的符号。
    pub fn set_gain(&mut self, which: Gain, value: f64) {
        match which {
            Gain::Kp => self.kp = value,
            Gain::Ki => self.ki = value,
            Gain::Kd => self.kd = value,
        }
    }

    /// 修改积分累积上限（不做检查）
    pub fn set_max_integral(&mut self, value: f64) {
        self.max_integral = value;
    }

    pub fn set_disable_threshold(&mut self, value: f64) {
        self.disable_threshold = value;
    }

    /// 计算一次控制输出
    ///
    /// # 参数
    ///
    /// - `measurement`: 测得速度（rad/s）
    /// - `reference`: 参考速度（rad/s）
    ///
    /// # 返回
    ///
    /// 未限幅的控制量；`reference < disable_threshold` 时为 `0.0`。
    pub fn update(&mut self, measurement: f64, reference: f64) -> f64 {
        if !self.is_enabled_for(reference) {
            return 0.0;
        }

        // 1. 误差
        let error = reference - measurement;

        // 2. 比例项（P）
        let p_term = self.kp * error;

        // 3. 积分项（I）：越界则整次累加作废
        let candidate = self.integral_sum + error;
        if candidate.abs() < self.max_integral {
            self.integral_sum = candidate;
        }
        let i_term = self.ki * self.integral_sum;

        // 4. 微分项（D），作用在测量值上
        let d_term = self.kd * (self.previous_measurement - measurement);
        self.previous_measurement = measurement;

        trace!(
            "pid: e={:.4} p={:.4} i={:.4} d={:.4} sum={:.4}",
            error, p_term, i_term, d_term, self.integral_sum
        );

        p_term + i_term + d_term
    }

    /// 当前参考值下控制器是否工作
    pub fn is_enabled_for(&self, reference: f64) -> bool {
        reference >= self.disable_threshold
    }

    pub fn gains(&self) -> Gains {
        Gains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
        }
    }

    /// 获取当前积分累积值
    ///
    /// 用于调试和监控。
    pub fn integral_sum(&self) -> f64 {
        self.integral_sum
    }

    pub fn previous_measurement(&self) -> f64 {
        self.previous_measurement
    }

    pub fn max_integral(&self) -> f64 {
        self.max_integral
    }

    pub fn disable_threshold(&self) -> f64 {
        self.disable_threshold
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new()
    }
}
