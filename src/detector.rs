// 该文件是 Dianming （点名） 项目的一部分。
// src/detector.rs - 人脸检测与编码能力定义
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, identity::FeatureVector};

/// 检测能力：给定一帧图像，返回零个或多个人脸区域及各自的特征向量。
/// 实现必须是图像的纯函数，不持有跨帧状态。
pub trait Detector {
  type Error;

  fn detect(&self, frame: &Frame) -> Result<FrameObservation, Self::Error>;
}

/// 人脸区域，像素坐标 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceRegion {
  pub bbox: [u32; 4],
}

impl FaceRegion {
  pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
    Self {
      bbox: [x_min, y_min, x_max, y_max],
    }
  }

  pub fn width(&self) -> u32 {
    self.bbox[2].saturating_sub(self.bbox[0])
  }

  pub fn height(&self) -> u32 {
    self.bbox[3].saturating_sub(self.bbox[1])
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
  pub bbox: FaceRegion,
  pub encoding: FeatureVector,
}

/// 单帧检测结果，按检测顺序排列；没有人脸时为空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameObservation {
  pub faces: Box<[FaceDetection]>,
}

impl FrameObservation {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.faces.is_empty()
  }

  pub fn len(&self) -> usize {
    self.faces.len()
  }

  /// 主人脸：考勤逻辑只看第一个检测到的人脸
  pub fn primary(&self) -> Option<&FaceDetection> {
    self.faces.first()
  }
}

impl From<Vec<FaceDetection>> for FrameObservation {
  fn from(faces: Vec<FaceDetection>) -> Self {
    Self {
      faces: faces.into_boxed_slice(),
    }
  }
}

mod replay;
pub use self::replay::{ReplayDetector, ReplayDetectorError};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("回放检测错误: {0}")]
  ReplayDetectorError(#[from] ReplayDetectorError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum DetectorWrapper {
  Replay(ReplayDetector),
}

impl FromUrl for DetectorWrapper {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ReplayDetector::SCHEME => Ok(DetectorWrapper::Replay(ReplayDetector::from_url(url)?)),
      other => Err(DetectorError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Detector for DetectorWrapper {
  type Error = DetectorError;

  fn detect(&self, frame: &Frame) -> Result<FrameObservation, Self::Error> {
    match self {
      DetectorWrapper::Replay(detector) => detector.detect(frame).map_err(DetectorError::from),
    }
  }
}
