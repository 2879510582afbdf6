// 该文件是 Dianming （点名） 项目的一部分。
// src/state.rs - 考勤确认状态机
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

//! 逐帧去抖的考勤确认状态机。
//!
//! 每个处理帧调用一次 [`AttendanceStateMachine::step`]，按以下优先级转移：
//!
//! 1. 没有人脸：回到 `Waiting`，计数器与已标记标志清零；
//! 2. 有人脸但未识别：`Unknown`，计数器与标志保持不变；
//! 3. 识别到身份：计数器加一，未超过确认次数时为 `Found`，
//!    超过后查询冷却窗口并尝试写入考勤；
//! 4. 处于 `Found`/`Marked`/`AlreadyMarked` 且计数器超过重置次数时强制回到 `Waiting`。

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
  cooldown::{CooldownDecision, CooldownGate},
  identity::Identity,
  scorer::MatchDecision,
  store::{AttendanceEvent, AttendanceRecord, AttendanceStore},
};

pub const DEFAULT_ACCEPT_COUNTER: u32 = 2;
pub const DEFAULT_RESET_COUNTER: u32 = 4;

/// 界面状态；只有确认阶段的状态携带当前身份
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
  #[default]
  Waiting,
  Unknown,
  Found(Arc<Identity>),
  Marked(Arc<Identity>),
  AlreadyMarked(Arc<Identity>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
  Waiting,
  Found,
  Unknown,
  Marked,
  AlreadyMarked,
}

impl ModeKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ModeKind::Waiting => "Waiting",
      ModeKind::Found => "Found",
      ModeKind::Unknown => "Unknown",
      ModeKind::Marked => "Marked",
      ModeKind::AlreadyMarked => "AlreadyMarked",
    }
  }
}

impl fmt::Display for ModeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Mode {
  pub fn kind(&self) -> ModeKind {
    match self {
      Mode::Waiting => ModeKind::Waiting,
      Mode::Unknown => ModeKind::Unknown,
      Mode::Found(_) => ModeKind::Found,
      Mode::Marked(_) => ModeKind::Marked,
      Mode::AlreadyMarked(_) => ModeKind::AlreadyMarked,
    }
  }

  pub fn active_identity(&self) -> Option<&Arc<Identity>> {
    match self {
      Mode::Found(identity) | Mode::Marked(identity) | Mode::AlreadyMarked(identity) => {
        Some(identity)
      }
      Mode::Waiting | Mode::Unknown => None,
    }
  }

  /// 是否处于受重置检查约束的确认阶段
  fn is_confirming(&self) -> bool {
    self.active_identity().is_some()
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.active_identity() {
      Some(identity) => write!(f, "{}({})", self.kind(), identity.id),
      None => write!(f, "{}", self.kind()),
    }
  }
}

/// 识别会话唯一的可变状态，由调用方独占持有，每个处理帧更新一次
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognitionState {
  mode: Mode,
  counter: u32,
  attendance_marked: bool,
}

impl RecognitionState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn counter(&self) -> u32 {
    self.counter
  }

  pub fn attendance_marked(&self) -> bool {
    self.attendance_marked
  }

  pub fn active_identity(&self) -> Option<&Arc<Identity>> {
    self.mode.active_identity()
  }

  fn reset(&mut self) {
    self.mode = Mode::Waiting;
    self.counter = 0;
    self.attendance_marked = false;
  }
}

/// 状态机每帧的输入：主人脸的判定结果
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
  NoFace,
  Unknown,
  Known(Arc<Identity>),
}

impl From<Option<&MatchDecision>> for Observed {
  fn from(decision: Option<&MatchDecision>) -> Self {
    match decision {
      None => Observed::NoFace,
      Some(MatchDecision {
        identity: Some(identity),
        ..
      }) => Observed::Known(identity.clone()),
      Some(_) => Observed::Unknown,
    }
  }
}

/// 考勤写入意图的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
  Appended(AttendanceRecord),
  CooldownDenied { seconds_since_last: i64 },
  /// 存储查询或写入失败：显示为 `AlreadyMarked` 但不标记，下一个确认帧会重试
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepOutcome {
  pub write: Option<WriteOutcome>,
  /// 本帧是否触发了强制重置
  pub reset: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AttendanceStateMachine {
  accept_counter: u32,
  reset_counter: u32,
  gate: CooldownGate,
}

impl Default for AttendanceStateMachine {
  fn default() -> Self {
    Self::new(DEFAULT_ACCEPT_COUNTER, DEFAULT_RESET_COUNTER, CooldownGate::default())
  }
}

impl AttendanceStateMachine {
  pub fn new(accept_counter: u32, reset_counter: u32, gate: CooldownGate) -> Self {
    Self {
      accept_counter,
      reset_counter,
      gate,
    }
  }

  pub fn accept_counter(&self) -> u32 {
    self.accept_counter
  }

  pub fn reset_counter(&self) -> u32 {
    self.reset_counter
  }

  pub fn step<S: AttendanceStore>(
    &self,
    state: &mut RecognitionState,
    observed: Observed,
    store: &mut S,
    now: DateTime<Utc>,
  ) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    match observed {
      Observed::NoFace => {
        state.reset();
        return outcome;
      }
      Observed::Unknown => {
        state.mode = Mode::Unknown;
      }
      Observed::Known(identity) => {
        state.counter = state.counter.saturating_add(1);

        if state.counter <= self.accept_counter {
          state.mode = Mode::Found(identity);
        } else if !state.attendance_marked {
          outcome.write = Some(self.activate(state, identity, store, now));
        } else {
          state.mode = match std::mem::take(&mut state.mode) {
            Mode::Marked(_) => Mode::Marked(identity),
            Mode::AlreadyMarked(_) => Mode::AlreadyMarked(identity),
            // 已标记后出现过未知人脸时保持 Unknown，重置检查不覆盖 Unknown，计数器会一直增长直到人脸消失
            other => other,
          };
        }
      }
    }

    debug!("计数器: {}, 当前状态: {}", state.counter, state.mode);

    if state.mode.is_confirming() && state.counter > self.reset_counter {
      debug!("计数器超过 {}，重置会话", self.reset_counter);
      state.reset();
      outcome.reset = true;
    }

    outcome
  }

  fn activate<S: AttendanceStore>(
    &self,
    state: &mut RecognitionState,
    identity: Arc<Identity>,
    store: &mut S,
    now: DateTime<Utc>,
  ) -> WriteOutcome {
    let seconds_since_last = match store.seconds_since_last(&identity.id, now) {
      Ok(seconds) => seconds,
      Err(e) => {
        error!("查询 {} 的最近考勤时间失败: {}", identity.id, e);
        state.mode = Mode::AlreadyMarked(identity);
        return WriteOutcome::Failed(e.to_string());
      }
    };
    debug!("{} 距上次考勤: {} 秒", identity.id, seconds_since_last);

    match self.gate.check(seconds_since_last) {
      CooldownDecision::Permit => {
        match store.append(&AttendanceEvent::new(identity.id.clone(), now)) {
          Ok(record) => {
            info!("考勤写入成功: {} ({})", identity.display_name, identity.id);
            state.attendance_marked = true;
            state.mode = Mode::Marked(identity);
            WriteOutcome::Appended(record)
          }
          Err(e) => {
            error!("考勤写入失败: {} ({}): {}", identity.display_name, identity.id, e);
            state.mode = Mode::AlreadyMarked(identity);
            WriteOutcome::Failed(e.to_string())
          }
        }
      }
      CooldownDecision::Deny { seconds_since_last } => {
        info!(
          "{} 在 {} 秒前已完成考勤",
          identity.display_name, seconds_since_last
        );
        state.mode = Mode::AlreadyMarked(identity);
        WriteOutcome::CooldownDenied { seconds_since_last }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{identity::IdentityId, store::MemoryAttendanceStore};

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  fn alice() -> Arc<Identity> {
    Arc::new(Identity::new("s001", "Alice", "CS", vec![0.0, 0.0]))
  }

  fn bob() -> Arc<Identity> {
    Arc::new(Identity::new("s002", "Bob", "EE", vec![1.0, 0.0]))
  }

  /// 可编排应答的考勤存储
  #[derive(Default)]
  struct ScriptedStore {
    since: i64,
    fail_query: bool,
    fail_append: usize,
    appended: Vec<AttendanceEvent>,
  }

  impl AttendanceStore for ScriptedStore {
    type Error = String;

    fn seconds_since_last(&self, _: &IdentityId, _: DateTime<Utc>) -> Result<i64, Self::Error> {
      if self.fail_query {
        return Err("database is locked".to_string());
      }
      Ok(self.since)
    }

    fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
      if self.fail_append > 0 {
        self.fail_append -= 1;
        return Err("disk full".to_string());
      }
      self.appended.push(event.clone());
      Ok(AttendanceRecord {
        seq: self.appended.len() as u64 - 1,
        identity_id: event.identity_id.clone(),
        timestamp: event.timestamp.timestamp(),
      })
    }

    fn records(&self, _: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
      Ok(Vec::new())
    }
  }

  #[test]
  fn counter_tracks_consecutive_confirmations() {
    let machine = AttendanceStateMachine::new(2, 10, CooldownGate::default());
    let mut state = RecognitionState::new();
    let mut store = MemoryAttendanceStore::new();

    for n in 1..=10 {
      machine.step(&mut state, Observed::Known(alice()), &mut store, now());
      assert_eq!(state.counter(), n);
    }
    machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    assert_eq!(state.counter(), 0);
  }

  #[test]
  fn no_face_always_returns_to_waiting() {
    let machine = AttendanceStateMachine::default();
    let mut store = MemoryAttendanceStore::new();

    for warmup in 0..5 {
      let mut state = RecognitionState::new();
      for _ in 0..warmup {
        machine.step(&mut state, Observed::Known(alice()), &mut store, now());
      }
      machine.step(&mut state, Observed::Unknown, &mut store, now());
      let outcome = machine.step(&mut state, Observed::NoFace, &mut store, now());
      assert_eq!(state, RecognitionState::new());
      assert_eq!(outcome, StepOutcome::default());
      assert!(state.active_identity().is_none());
    }
  }

  #[test]
  fn unknown_keeps_counter_and_flag() {
    let machine = AttendanceStateMachine::default();
    let mut state = RecognitionState::new();
    let mut store = MemoryAttendanceStore::new();

    for _ in 0..3 {
      machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    }
    assert!(state.attendance_marked());
    machine.step(&mut state, Observed::Unknown, &mut store, now());
    assert_eq!(state.mode(), &Mode::Unknown);
    assert_eq!(state.counter(), 3);
    assert!(state.attendance_marked());
    assert!(state.active_identity().is_none());
  }

  #[test]
  fn unknown_is_not_subject_to_reset() {
    let machine = AttendanceStateMachine::default();
    let mut state = RecognitionState::new();
    let mut store = MemoryAttendanceStore::new();

    for _ in 0..3 {
      machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    }
    machine.step(&mut state, Observed::Unknown, &mut store, now());
    // 已标记时保持上一帧的状态
    machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    assert_eq!(state.mode(), &Mode::Unknown);
    assert_eq!(state.counter(), 4);
    machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    assert_eq!(state.mode(), &Mode::Unknown);
    assert_eq!(state.counter(), 5);
  }

  #[test]
  fn marked_mode_follows_current_identity() {
    let machine = AttendanceStateMachine::new(2, 10, CooldownGate::default());
    let mut state = RecognitionState::new();
    let mut store = MemoryAttendanceStore::new();

    for _ in 0..3 {
      machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    }
    assert_eq!(state.mode(), &Mode::Marked(alice()));
    let outcome = machine.step(&mut state, Observed::Known(bob()), &mut store, now());
    assert_eq!(state.mode(), &Mode::Marked(bob()));
    assert!(outcome.write.is_none());
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn reset_fires_once_counter_exceeds_limit() {
    let machine = AttendanceStateMachine::default();
    let mut state = RecognitionState::new();
    let mut store = ScriptedStore {
      since: 50,
      ..Default::default()
    };

    let mut kinds = Vec::new();
    let mut resets = Vec::new();
    for _ in 0..6 {
      let outcome = machine.step(&mut state, Observed::Known(alice()), &mut store, now());
      kinds.push(state.mode().kind());
      resets.push(outcome.reset);
    }
    assert_eq!(
      kinds,
      vec![
        ModeKind::Found,
        ModeKind::Found,
        ModeKind::AlreadyMarked,
        ModeKind::AlreadyMarked,
        ModeKind::Waiting,
        ModeKind::Found,
      ]
    );
    assert_eq!(resets, vec![false, false, false, false, true, false]);
    assert!(store.appended.is_empty());
  }

  #[test]
  fn write_failure_is_not_marked_and_retried() {
    let machine = AttendanceStateMachine::default();
    let mut state = RecognitionState::new();
    let mut store = ScriptedStore {
      fail_append: 1,
      ..Default::default()
    };

    machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    machine.step(&mut state, Observed::Known(alice()), &mut store, now());

    let failed = machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    assert!(matches!(failed.write, Some(WriteOutcome::Failed(ref msg)) if msg == "disk full"));
    assert_eq!(state.mode(), &Mode::AlreadyMarked(alice()));
    assert!(!state.attendance_marked());

    let retried = machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    assert!(matches!(retried.write, Some(WriteOutcome::Appended(_))));
    assert_eq!(state.mode(), &Mode::Marked(alice()));
    assert!(state.attendance_marked());
    assert_eq!(store.appended.len(), 1);
  }

  #[test]
  fn query_failure_skips_the_write() {
    let machine = AttendanceStateMachine::default();
    let mut state = RecognitionState::new();
    let mut store = ScriptedStore {
      fail_query: true,
      ..Default::default()
    };

    for _ in 0..3 {
      machine.step(&mut state, Observed::Known(alice()), &mut store, now());
    }
    assert_eq!(state.mode().kind(), ModeKind::AlreadyMarked);
    assert!(!state.attendance_marked());
    assert!(store.appended.is_empty());
  }

  #[test]
  fn observed_from_decision() {
    let known = MatchDecision {
      identity: Some(alice()),
      distance: 0.3,
      confidence_pct: 99.3,
    };
    let unknown = MatchDecision {
      identity: None,
      distance: 0.8,
      confidence_pct: 25.0,
    };
    assert_eq!(Observed::from(None), Observed::NoFace);
    assert_eq!(Observed::from(Some(&known)), Observed::Known(alice()));
    assert_eq!(Observed::from(Some(&unknown)), Observed::Unknown);
  }
}
