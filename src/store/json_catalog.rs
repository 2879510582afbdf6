// 该文件是 Dianming （点名） 项目的一部分。
// src/store/json_catalog.rs - JSON 文件身份目录
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
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
};

use chrono::DateTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  identity::{FeatureVector, Identity},
  store::CatalogStore,
};

#[derive(Error, Debug)]
pub enum JsonCatalogStoreError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("身份 {0} 的特征向量无法解析: {1}")]
  InvalidEncoding(String, serde_json::Error),
}

/// 特征向量既可以是数组，也可以是数组的 JSON 文本（登记系统的存储格式）
#[derive(Deserialize)]
#[serde(untagged)]
enum Encodings {
  List(Vec<f64>),
  Text(String),
}

#[derive(Deserialize)]
struct CatalogEntry {
  id: String,
  name: String,
  #[serde(default)]
  course: String,
  #[serde(default)]
  image: Option<String>,
  encodings: Encodings,
  /// Unix 时间戳（秒）
  #[serde(default)]
  join_date: Option<i64>,
}

/// 身份目录文件，格式为条目数组：
/// `[{"id": "s001", "name": "Alice", "course": "CS", "image": "s001.png", "encodings": [...]}]`
///
/// 照片路径相对于目录文件所在目录解析。
pub struct JsonCatalogStore {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonCatalogStore {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonCatalogStore {
  type Error = JsonCatalogStoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(JsonCatalogStoreError::SchemeMismatch);
    }
    Ok(Self::new(url.path()))
  }
}

impl JsonCatalogStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  fn resolve_image(&self, image: &str) -> PathBuf {
    let image = Path::new(image);
    if image.is_absolute() {
      return image.to_path_buf();
    }
    self
      .path
      .parent()
      .map(|dir| dir.join(image))
      .unwrap_or_else(|| image.to_path_buf())
  }
}

impl CatalogStore for JsonCatalogStore {
  type Error = JsonCatalogStoreError;

  fn load_all(&self) -> Result<Vec<Identity>, Self::Error> {
    info!("加载身份目录: {}", self.path.display());
    let reader = BufReader::new(File::open(&self.path)?);
    let entries: Vec<CatalogEntry> = serde_json::from_reader(reader)?;

    let mut identities = Vec::with_capacity(entries.len());
    for entry in entries {
      let encodings = match entry.encodings {
        Encodings::List(values) => values,
        Encodings::Text(text) => serde_json::from_str(&text)
          .map_err(|e| JsonCatalogStoreError::InvalidEncoding(entry.id.clone(), e))?,
      };

      let mut identity = Identity::new(
        entry.id,
        entry.name,
        entry.course,
        FeatureVector::new(encodings),
      );
      if let Some(image) = entry.image.as_deref() {
        identity = identity.with_reference_image(self.resolve_image(image));
      }
      if let Some(join_date) = entry.join_date.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        identity = identity.with_join_date(join_date);
      }
      debug!("身份: {} ({})", identity.id, identity.display_name);
      identities.push(identity);
    }

    info!("共加载 {} 个身份", identities.len());
    Ok(identities)
  }
}
