// 该文件是 Dianming （点名） 项目的一部分。
// src/store/memory.rs - 内存考勤记录
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

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  identity::IdentityId,
  store::{AttendanceEvent, AttendanceRecord, AttendanceStore, StoreError, elapsed_seconds, newest_first},
};

/// 进程内考勤记录，进程退出即丢弃，用于试运行
#[derive(Debug, Default)]
pub struct MemoryAttendanceStore {
  records: Vec<AttendanceRecord>,
}

impl FromUrlWithScheme for MemoryAttendanceStore {
  const SCHEME: &'static str = "memory";
}

impl FromUrl for MemoryAttendanceStore {
  type Error = StoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StoreError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::default())
  }
}

impl MemoryAttendanceStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl AttendanceStore for MemoryAttendanceStore {
  type Error = Infallible;

  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error> {
    let last = self
      .records
      .iter()
      .filter(|r| &r.identity_id == id)
      .map(|r| r.timestamp)
      .max();
    Ok(elapsed_seconds(last, now))
  }

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
    let record = AttendanceRecord {
      seq: self.records.len() as u64,
      identity_id: event.identity_id.clone(),
      timestamp: event.timestamp.timestamp(),
    };
    self.records.push(record.clone());
    Ok(record)
  }

  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
    Ok(newest_first(&self.records, identity))
  }
}
