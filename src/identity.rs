// 该文件是 Dianming （点名） 项目的一部分。
// src/identity.rs - 已知身份与身份目录
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

use std::{collections::HashSet, fmt, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 身份标识（学号等），在目录中唯一
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for IdentityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for IdentityId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

/// 人脸特征向量
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
  pub fn new(values: Vec<f64>) -> Self {
    Self(values)
  }

  pub fn as_slice(&self) -> &[f64] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// 欧氏距离；维度不一致时返回正无穷，保证永远不会被判定为匹配
  pub fn distance(&self, other: &FeatureVector) -> f64 {
    if self.len() != other.len() {
      return f64::INFINITY;
    }
    self
      .0
      .iter()
      .zip(other.0.iter())
      .map(|(a, b)| (a - b) * (a - b))
      .sum::<f64>()
      .sqrt()
  }
}

impl From<Vec<f64>> for FeatureVector {
  fn from(values: Vec<f64>) -> Self {
    Self::new(values)
  }
}

/// 已登记的身份，会话期间只读
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
  pub id: IdentityId,
  pub display_name: String,
  pub course: String,
  pub feature_vector: FeatureVector,
  /// 登记照片路径，由渲染端使用
  pub reference_image: Option<PathBuf>,
  pub join_date: Option<DateTime<Utc>>,
}

impl Identity {
  pub fn new(
    id: impl Into<IdentityId>,
    display_name: impl Into<String>,
    course: impl Into<String>,
    feature_vector: impl Into<FeatureVector>,
  ) -> Self {
    Self {
      id: id.into(),
      display_name: display_name.into(),
      course: course.into(),
      feature_vector: feature_vector.into(),
      reference_image: None,
      join_date: None,
    }
  }

  pub fn with_reference_image(mut self, path: impl Into<PathBuf>) -> Self {
    self.reference_image = Some(path.into());
    self
  }

  pub fn with_join_date(mut self, join_date: DateTime<Utc>) -> Self {
    self.join_date = Some(join_date);
    self
  }
}

impl From<String> for IdentityId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("身份标识重复: {0}")]
  DuplicateId(IdentityId),
  #[error("身份 {0} 的特征向量为空")]
  EmptyFeature(IdentityId),
  #[error("身份 {id} 的特征向量维度不一致: 期望 {expected}, 实际 {found}")]
  DimensionMismatch {
    id: IdentityId,
    expected: usize,
    found: usize,
  },
}

/// 身份目录，启动时加载一次
#[derive(Debug, Clone, Default)]
pub struct IdentityCatalog {
  identities: Vec<Arc<Identity>>,
}

impl IdentityCatalog {
  pub fn new(identities: Vec<Identity>) -> Result<Self, CatalogError> {
    let mut seen = HashSet::with_capacity(identities.len());
    let mut dimension = None;

    for identity in &identities {
      if !seen.insert(identity.id.clone()) {
        return Err(CatalogError::DuplicateId(identity.id.clone()));
      }
      let found = identity.feature_vector.len();
      if found == 0 {
        return Err(CatalogError::EmptyFeature(identity.id.clone()));
      }
      match dimension {
        None => dimension = Some(found),
        Some(expected) if expected != found => {
          return Err(CatalogError::DimensionMismatch {
            id: identity.id.clone(),
            expected,
            found,
          });
        }
        Some(_) => {}
      }
    }

    Ok(Self {
      identities: identities.into_iter().map(Arc::new).collect(),
    })
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.identities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.identities.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Identity>> {
    self.identities.iter()
  }

  pub fn get(&self, index: usize) -> Option<&Arc<Identity>> {
    self.identities.get(index)
  }

  pub fn find(&self, id: &IdentityId) -> Option<&Arc<Identity>> {
    self.identities.iter().find(|identity| &identity.id == id)
  }

  /// 目录中特征向量的维度，空目录时为 `None`
  pub fn dimension(&self) -> Option<usize> {
    self.identities.first().map(|i| i.feature_vector.len())
  }
}
