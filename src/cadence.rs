// 该文件是 Dianming （点名） 项目的一部分。
// src/cadence.rs - 隔帧检测与上一次检测结果缓存
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

use crate::scorer::ScoredObservation;

/// 隔帧检测节拍。
///
/// 每个有效帧调用一次 [`FrameCadence::advance`] 翻转奇偶标志，只有活跃帧运行检测；
/// 跳过的帧复用上一次的检测结果，此时结果标记为非新鲜。
#[derive(Debug, Clone)]
pub struct FrameCadence {
  process_current: bool,
  last: Option<ScoredObservation>,
  fresh: bool,
}

impl Default for FrameCadence {
  fn default() -> Self {
    Self::new()
  }
}

impl FrameCadence {
  /// 第一帧为活跃帧
  pub fn new() -> Self {
    Self {
      process_current: true,
      last: None,
      fresh: false,
    }
  }

  /// 当前帧是否需要运行检测
  pub fn is_active_tick(&self) -> bool {
    self.process_current
  }

  /// 写入本帧的新检测结果
  pub fn refresh(&mut self, observation: ScoredObservation) {
    self.last = Some(observation);
    self.fresh = true;
  }

  /// 最近一次检测结果；尚未成功检测过时为 `None`
  pub fn latest(&self) -> Option<&ScoredObservation> {
    self.last.as_ref()
  }

  /// 最近一次结果是否来自当前帧
  pub fn is_fresh(&self) -> bool {
    self.fresh
  }

  /// 当前帧处理完毕
  pub fn advance(&mut self) {
    self.process_current = !self.process_current;
    self.fresh = false;
  }
}
