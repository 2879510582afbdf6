// 该文件是 Dianming （点名） 项目的一部分。
// src/store.rs - 身份目录与考勤记录存储
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
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  identity::{Identity, IdentityId},
};

/// 一次考勤事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEvent {
  pub identity_id: IdentityId,
  pub timestamp: DateTime<Utc>,
}

impl AttendanceEvent {
  pub fn new(identity_id: IdentityId, timestamp: DateTime<Utc>) -> Self {
    Self {
      identity_id,
      timestamp,
    }
  }
}

/// 持久化后的考勤记录，时间戳为取整到秒的 Unix 时间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub seq: u64,
  pub identity_id: IdentityId,
  pub timestamp: i64,
}

impl AttendanceRecord {
  pub fn time(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.timestamp, 0)
  }
}

/// 身份目录存储，启动时读取一次
pub trait CatalogStore {
  type Error;

  fn load_all(&self) -> Result<Vec<Identity>, Self::Error>;
}

/// 考勤记录存储，只追加
pub trait AttendanceStore {
  type Error: std::fmt::Display;

  /// 距该身份最近一次考勤的秒数；从未记录时为 0。
  /// 本秒内刚写入的记录报告为 1，不与“从未记录”混淆。
  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error>;

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error>;

  /// 按时间倒序列出记录，可按身份过滤
  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error>;
}

impl<S: AttendanceStore + ?Sized> AttendanceStore for &mut S {
  type Error = S::Error;

  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error> {
    (**self).seconds_since_last(id, now)
  }

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
    (**self).append(event)
  }

  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
    (**self).records(identity)
  }
}

fn elapsed_seconds(last: Option<i64>, now: DateTime<Utc>) -> i64 {
  match last {
    None => 0,
    Some(last) => (now.timestamp() - last).max(1),
  }
}

fn newest_first(
  records: &[AttendanceRecord],
  identity: Option<&IdentityId>,
) -> Vec<AttendanceRecord> {
  let mut selected: Vec<_> = records
    .iter()
    .filter(|r| identity.is_none_or(|id| &r.identity_id == id))
    .cloned()
    .collect();
  selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)));
  selected
}

mod json_catalog;
pub use self::json_catalog::{JsonCatalogStore, JsonCatalogStoreError};

mod jsonl_attendance;
pub use self::jsonl_attendance::{JsonlAttendanceStore, JsonlAttendanceStoreError};

mod memory;
pub use self::memory::MemoryAttendanceStore;

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("JSON 身份目录错误: {0}")]
  JsonCatalogStoreError(#[from] JsonCatalogStoreError),
  #[error("JSONL 考勤记录错误: {0}")]
  JsonlAttendanceStoreError(#[from] JsonlAttendanceStoreError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl From<Infallible> for StoreError {
  fn from(err: Infallible) -> Self {
    match err {}
  }
}

pub enum CatalogStoreWrapper {
  Json(JsonCatalogStore),
}

impl FromUrl for CatalogStoreWrapper {
  type Error = StoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonCatalogStore::SCHEME => Ok(CatalogStoreWrapper::Json(JsonCatalogStore::from_url(url)?)),
      other => Err(StoreError::SchemeMismatch(other.to_string())),
    }
  }
}

impl CatalogStore for CatalogStoreWrapper {
  type Error = StoreError;

  fn load_all(&self) -> Result<Vec<Identity>, Self::Error> {
    match self {
      CatalogStoreWrapper::Json(store) => store.load_all().map_err(StoreError::from),
    }
  }
}

pub enum AttendanceStoreWrapper {
  Jsonl(JsonlAttendanceStore),
  Memory(MemoryAttendanceStore),
}

impl FromUrl for AttendanceStoreWrapper {
  type Error = StoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      JsonlAttendanceStore::SCHEME => Ok(AttendanceStoreWrapper::Jsonl(
        JsonlAttendanceStore::from_url(url)?,
      )),
      MemoryAttendanceStore::SCHEME => Ok(AttendanceStoreWrapper::Memory(
        MemoryAttendanceStore::from_url(url)?,
      )),
      other => Err(StoreError::SchemeMismatch(other.to_string())),
    }
  }
}

impl AttendanceStore for AttendanceStoreWrapper {
  type Error = StoreError;

  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error> {
    match self {
      AttendanceStoreWrapper::Jsonl(store) => Ok(store.seconds_since_last(id, now)?),
      AttendanceStoreWrapper::Memory(store) => Ok(store.seconds_since_last(id, now)?),
    }
  }

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
    match self {
      AttendanceStoreWrapper::Jsonl(store) => Ok(store.append(event)?),
      AttendanceStoreWrapper::Memory(store) => Ok(store.append(event)?),
    }
  }

  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
    match self {
      AttendanceStoreWrapper::Jsonl(store) => Ok(store.records(identity)?),
      AttendanceStoreWrapper::Memory(store) => Ok(store.records(identity)?),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elapsed_is_zero_only_when_never_recorded() {
    let now = DateTime::from_timestamp(1_000, 0).unwrap();
    assert_eq!(elapsed_seconds(None, now), 0);
    assert_eq!(elapsed_seconds(Some(1_000), now), 1);
    assert_eq!(elapsed_seconds(Some(950), now), 50);
    assert_eq!(elapsed_seconds(Some(2_000), now), 1);
  }

  #[test]
  fn records_are_listed_newest_first() {
    let records = vec![
      AttendanceRecord {
        seq: 0,
        identity_id: "a".into(),
        timestamp: 10,
      },
      AttendanceRecord {
        seq: 1,
        identity_id: "b".into(),
        timestamp: 20,
      },
      AttendanceRecord {
        seq: 2,
        identity_id: "a".into(),
        timestamp: 30,
      },
    ];
    let all = newest_first(&records, None);
    assert_eq!(all.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![2, 1, 0]);
    let only_a = newest_first(&records, Some(&"a".into()));
    assert_eq!(only_a.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![2, 0]);
  }
}
