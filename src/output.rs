// 该文件是 Dianming （点名） 项目的一部分。
// src/output.rs - 状态叠加层输出定义
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

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detector::FaceRegion,
  frame::Frame,
  identity::Identity,
  scorer::LabeledFace,
  state::Mode,
};

/// 渲染端：只接收结果，不向识别核心反馈任何状态
pub trait Render {
  type Error;
  fn render_result(&self, frame: &Frame, overlay: &Overlay<'_>) -> Result<(), Self::Error>;
}

impl<R: Render + ?Sized> Render for &R {
  type Error = R::Error;

  fn render_result(&self, frame: &Frame, overlay: &Overlay<'_>) -> Result<(), Self::Error> {
    (**self).render_result(frame, overlay)
  }
}

/// 每帧交给渲染端的叠加信息
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
  pub tick: u64,
  pub mode: &'a Mode,
  pub counter: u32,
  /// 所有人脸的判定结果，第一个为主人脸
  pub faces: &'a [LabeledFace],
  /// 人脸结果是否为本帧新检测，跳过的帧沿用上一次结果
  pub fresh: bool,
}

impl Overlay<'_> {
  pub fn active_identity(&self) -> Option<&Arc<Identity>> {
    self.mode.active_identity()
  }

  pub fn primary_region(&self) -> Option<FaceRegion> {
    self.faces.first().map(|face| face.region)
  }

  /// 需要展示个人资料卡的身份，仅在 `Found` 阶段展示
  pub fn profile(&self) -> Option<&Arc<Identity>> {
    match self.mode {
      Mode::Found(identity) => Some(identity),
      _ => None,
    }
  }
}

mod log_output;
pub use self::log_output::LogOutput;

#[cfg(feature = "directory_record")]
pub mod draw;

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl From<std::convert::Infallible> for OutputError {
  fn from(err: std::convert::Infallible) -> Self {
    match err {}
  }
}

pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, overlay: &Overlay<'_>) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => Ok(output.render_result(frame, overlay)?),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, overlay)
        .map_err(OutputError::from),
    }
  }
}
