// 该文件是 Dianming （点名） 项目的一部分。
// tests/common/mod.rs - 集成测试公共工具
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

#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, convert::Infallible};

use chrono::{DateTime, Utc};

use dianming::{
  detector::{FaceDetection, FaceRegion, ReplayDetector},
  frame::Frame,
  identity::{Identity, IdentityCatalog, IdentityId},
  output::{Overlay, Render},
  state::ModeKind,
  store::{AttendanceEvent, AttendanceRecord, AttendanceStore, MemoryAttendanceStore},
};

pub fn alice() -> Identity {
  Identity::new("s001", "Alice", "Computer Science", vec![0.0, 0.0])
}

pub fn bob() -> Identity {
  Identity::new("s002", "Bob", "Mathematics", vec![1.0, 1.0])
}

pub fn catalog() -> IdentityCatalog {
  IdentityCatalog::new(vec![alice(), bob()]).unwrap()
}

/// 与 Alice 距离 0.3 的人脸
pub fn alice_face() -> FaceDetection {
  FaceDetection {
    bbox: FaceRegion::new(10, 10, 50, 50),
    encoding: vec![0.3, 0.0].into(),
  }
}

/// 与 Alice 的距离刚好超过默认阈值
pub fn borderline_face() -> FaceDetection {
  FaceDetection {
    bbox: FaceRegion::new(10, 10, 50, 50),
    encoding: vec![0.60004, 0.0].into(),
  }
}

pub fn frame_name(index: u64) -> String {
  format!("{:04}.png", index + 1)
}

pub fn frames(count: u64) -> Vec<Frame> {
  (0..count).map(|i| Frame::blank(i, frame_name(i))).collect()
}

/// 每一帧都检测到同一张人脸
pub fn replay_everywhere(count: u64, face: FaceDetection) -> ReplayDetector {
  let detections: HashMap<_, _> = (0..count)
    .map(|i| (frame_name(i), vec![face.clone()]))
    .collect();
  ReplayDetector::from_map(detections)
}

pub fn at(seconds: i64) -> DateTime<Utc> {
  DateTime::from_timestamp(1_767_225_600 + seconds, 0).unwrap()
}

/// 记录渲染端收到的每一帧
#[derive(Default)]
pub struct Recorder {
  pub frames: RefCell<Vec<(ModeKind, u32, usize, bool)>>,
  /// 每帧所有人脸的标签与置信度文本
  pub labels: RefCell<Vec<Vec<String>>>,
}

impl Recorder {
  pub fn modes(&self) -> Vec<ModeKind> {
    self.frames.borrow().iter().map(|f| f.0).collect()
  }

  pub fn freshness(&self) -> Vec<bool> {
    self.frames.borrow().iter().map(|f| f.3).collect()
  }
}

impl Render for Recorder {
  type Error = Infallible;

  fn render_result(&self, _frame: &Frame, overlay: &Overlay<'_>) -> Result<(), Self::Error> {
    self.frames.borrow_mut().push((
      overlay.mode.kind(),
      overlay.counter,
      overlay.faces.len(),
      overlay.fresh,
    ));
    self.labels.borrow_mut().push(
      overlay
        .faces
        .iter()
        .map(|face| format!("{} {}", face.decision.label(), face.decision.confidence_text()))
        .collect(),
    );
    Ok(())
  }
}

/// 统计调用次数，可注入写入失败
#[derive(Default)]
pub struct CountingStore {
  pub inner: MemoryAttendanceStore,
  pub appends: Vec<IdentityId>,
  pub failing_appends: usize,
}

impl CountingStore {
  pub fn failing(failing_appends: usize) -> Self {
    Self {
      failing_appends,
      ..Self::default()
    }
  }
}

impl AttendanceStore for CountingStore {
  type Error = String;

  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error> {
    self.inner.seconds_since_last(id, now).map_err(|e| match e {})
  }

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
    if self.failing_appends > 0 {
      self.failing_appends -= 1;
      return Err("磁盘已满".to_string());
    }
    self.appends.push(event.identity_id.clone());
    self.inner.append(event).map_err(|e| match e {})
  }

  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
    self.inner.records(identity).map_err(|e| match e {})
  }
}
