// 该文件是 Dianming （点名） 项目的一部分。
// src/cooldown.rs - 考勤写入冷却窗口
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

pub const DEFAULT_COOLDOWN_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
  Permit,
  Deny { seconds_since_last: i64 },
}

impl CooldownDecision {
  pub fn is_permitted(&self) -> bool {
    matches!(self, CooldownDecision::Permit)
  }
}

/// 同一身份两次考勤写入的最小间隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownGate {
  cooldown_seconds: i64,
}

impl Default for CooldownGate {
  fn default() -> Self {
    Self::new(DEFAULT_COOLDOWN_SECONDS)
  }
}

impl CooldownGate {
  pub fn new(cooldown_seconds: i64) -> Self {
    Self { cooldown_seconds }
  }

  pub fn cooldown_seconds(&self) -> i64 {
    self.cooldown_seconds
  }

  /// `seconds_since_last` 为 0 表示从未记录，与超出窗口同样允许写入
  pub fn check(&self, seconds_since_last: i64) -> CooldownDecision {
    if seconds_since_last == 0 || seconds_since_last > self.cooldown_seconds {
      CooldownDecision::Permit
    } else {
      CooldownDecision::Deny { seconds_since_last }
    }
  }
}
