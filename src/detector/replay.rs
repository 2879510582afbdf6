// 该文件是 Dianming （点名） 项目的一部分。
// src/detector/replay.rs - 离线检测结果回放
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

//! 回放由外部人脸编码工具离线生成的检测结果。
//!
//! 文件为 JSON 对象，键为帧名称（图像文件名），值为该帧的人脸列表：
//!
//! ```json
//! {
//!   "0001.png": [{ "bbox": [120, 80, 220, 200], "encoding": [0.01, -0.12, 0.33] }],
//!   "0002.png": []
//! }
//! ```
//!
//! 未列出的帧视为没有人脸；URL 带 `strict` 查询参数时，未列出的帧视为检测失败。

use std::{collections::HashMap, fs::File, io::BufReader};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detector::{Detector, FaceDetection, FrameObservation},
  frame::Frame,
};

#[derive(Error, Debug)]
pub enum ReplayDetectorError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测结果解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("帧 {0} 没有检测结果")]
  MissingFrame(String),
}

pub struct ReplayDetector {
  detections: HashMap<String, Vec<FaceDetection>>,
  strict: bool,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ReplayDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayDetectorError::SchemeMismatch);
    }

    let path = url.path();
    info!("加载检测结果文件: {}", path);
    let reader = BufReader::new(File::open(path)?);
    let detections: HashMap<String, Vec<FaceDetection>> = serde_json::from_reader(reader)?;
    debug!("检测结果覆盖 {} 帧", detections.len());

    let strict = url.query_pairs().any(|(k, _)| k == "strict");

    Ok(Self { detections, strict })
  }
}

impl ReplayDetector {
  pub fn from_map(detections: HashMap<String, Vec<FaceDetection>>) -> Self {
    Self {
      detections,
      strict: false,
    }
  }

  pub fn strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }
}

impl Detector for ReplayDetector {
  type Error = ReplayDetectorError;

  fn detect(&self, frame: &Frame) -> Result<FrameObservation, Self::Error> {
    match self.detections.get(frame.name()) {
      Some(faces) => Ok(FrameObservation::from(faces.clone())),
      None if self.strict => Err(ReplayDetectorError::MissingFrame(frame.name().to_string())),
      None => Ok(FrameObservation::empty()),
    }
  }
}
