// 该文件是 Dianming （点名） 项目的一部分。
// src/config.rs - 识别参数配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

use crate::{
  cooldown::{CooldownGate, DEFAULT_COOLDOWN_SECONDS},
  scorer::{ConfidenceScorer, DEFAULT_MATCH_THRESHOLD},
  state::{AttendanceStateMachine, DEFAULT_ACCEPT_COUNTER, DEFAULT_RESET_COUNTER},
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("匹配阈值必须在 (0, 1) 之间, 实际为 {0}")]
  ThresholdOutOfRange(f64),
  #[error("重置次数 {reset} 不能小于确认次数 {accept}")]
  ResetBeforeAccept { accept: u32, reset: u32 },
  #[error("冷却时间不能为负数: {0}")]
  NegativeCooldown(i64),
}

/// 识别决策参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionConfig {
  /// 特征距离的接受阈值
  pub threshold: f64,
  /// 连续确认多少帧后才写入考勤
  pub accept_counter: u32,
  /// 确认会话持续多少帧后强制重置
  pub reset_counter: u32,
  /// 同一身份两次考勤的最小间隔（秒）
  pub cooldown_seconds: i64,
}

impl Default for RecognitionConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_MATCH_THRESHOLD,
      accept_counter: DEFAULT_ACCEPT_COUNTER,
      reset_counter: DEFAULT_RESET_COUNTER,
      cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
    }
  }
}

impl RecognitionConfig {
  pub fn validate(self) -> Result<Self, ConfigError> {
    if !(self.threshold > 0.0 && self.threshold < 1.0) {
      return Err(ConfigError::ThresholdOutOfRange(self.threshold));
    }
    if self.reset_counter < self.accept_counter {
      return Err(ConfigError::ResetBeforeAccept {
        accept: self.accept_counter,
        reset: self.reset_counter,
      });
    }
    if self.cooldown_seconds < 0 {
      return Err(ConfigError::NegativeCooldown(self.cooldown_seconds));
    }
    Ok(self)
  }

  pub fn scorer(&self) -> ConfidenceScorer {
    ConfidenceScorer::new(self.threshold)
  }

  pub fn state_machine(&self) -> AttendanceStateMachine {
    AttendanceStateMachine::new(
      self.accept_counter,
      self.reset_counter,
      CooldownGate::new(self.cooldown_seconds),
    )
  }
}
