// 该文件是 Dianming （点名） 项目的一部分。
// src/store/jsonl_attendance.rs - JSON Lines 考勤记录
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

use std::{
  collections::HashMap,
  fs::{File, OpenOptions},
  io::Write,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  identity::IdentityId,
  store::{AttendanceEvent, AttendanceRecord, AttendanceStore, elapsed_seconds, newest_first},
};

#[derive(Error, Debug)]
pub enum JsonlAttendanceStoreError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 记录文件的写入端
trait RecordSink: Write {
  fn sync(&self) -> std::io::Result<()>;
}

impl RecordSink for File {
  fn sync(&self) -> std::io::Result<()> {
    self.sync_data()
  }
}

/// 只追加的考勤记录文件，每行一条 JSON 记录。
///
/// 打开时读取已有记录并建立每个身份最近一次考勤时间的索引；
/// 每次写入后同步到磁盘。写入成功即更新索引，同步失败不会导致同一身份被重复写入。
pub struct JsonlAttendanceStore {
  path: PathBuf,
  file: Box<dyn RecordSink>,
  records: Vec<AttendanceRecord>,
  last_seen: HashMap<IdentityId, i64>,
  next_seq: u64,
  /// 文件末尾是未以换行结束的残行，下一条记录需另起一行
  torn_tail: bool,
}

impl FromUrlWithScheme for JsonlAttendanceStore {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonlAttendanceStore {
  type Error = JsonlAttendanceStoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(JsonlAttendanceStoreError::SchemeMismatch);
    }
    Self::open(url.path())
  }
}

impl JsonlAttendanceStore {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, JsonlAttendanceStoreError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }

    let contents = if path.exists() {
      std::fs::read(&path)?
    } else {
      Vec::new()
    };
    let records = Self::parse_records(&contents);
    let torn_tail = contents.last().is_some_and(|b| *b != b'\n');
    if torn_tail {
      warn!("考勤记录文件末尾有未完成的行: {}", path.display());
    }

    let mut last_seen: HashMap<IdentityId, i64> = HashMap::new();
    for record in &records {
      let last = last_seen.entry(record.identity_id.clone()).or_insert(record.timestamp);
      *last = (*last).max(record.timestamp);
    }
    let next_seq = records.iter().map(|r| r.seq + 1).max().unwrap_or(0);

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!(
      "考勤记录已打开: {}, 已有 {} 条记录",
      path.display(),
      records.len()
    );

    Ok(Self {
      path,
      file: Box::new(file),
      records,
      last_seen,
      next_seq,
      torn_tail,
    })
  }

  fn parse_records(contents: &[u8]) -> Vec<AttendanceRecord> {
    let mut records = Vec::new();
    for (line_no, line) in String::from_utf8_lossy(contents).lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      match serde_json::from_str::<AttendanceRecord>(line) {
        Ok(record) => records.push(record),
        Err(e) => warn!("跳过第 {} 行无法解析的记录: {}", line_no + 1, e),
      }
    }
    records
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl AttendanceStore for JsonlAttendanceStore {
  type Error = JsonlAttendanceStoreError;

  fn seconds_since_last(&self, id: &IdentityId, now: DateTime<Utc>) -> Result<i64, Self::Error> {
    Ok(elapsed_seconds(self.last_seen.get(id).copied(), now))
  }

  fn append(&mut self, event: &AttendanceEvent) -> Result<AttendanceRecord, Self::Error> {
    let record = AttendanceRecord {
      seq: self.next_seq,
      identity_id: event.identity_id.clone(),
      timestamp: event.timestamp.timestamp(),
    };

    // 整行一次写出，残行之后另起一行
    let mut line = Vec::new();
    if self.torn_tail {
      line.push(b'\n');
    }
    serde_json::to_writer(&mut line, &record)?;
    line.push(b'\n');
    debug!("写入考勤记录: {}", String::from_utf8_lossy(&line).trim());
    if let Err(e) = self.file.write_all(&line) {
      self.torn_tail = true;
      return Err(e.into());
    }
    self.torn_tail = false;

    self.next_seq += 1;
    let last = self
      .last_seen
      .entry(record.identity_id.clone())
      .or_insert(record.timestamp);
    *last = (*last).max(record.timestamp);
    self.records.push(record.clone());

    self.file.sync()?;
    Ok(record)
  }

  fn records(&self, identity: Option<&IdentityId>) -> Result<Vec<AttendanceRecord>, Self::Error> {
    Ok(newest_first(&self.records, identity))
  }
}
