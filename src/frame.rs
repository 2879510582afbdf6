// 该文件是 Dianming （点名） 项目的一部分。
// src/frame.rs - 视频帧定义
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

use image::RgbImage;

/// 输入源产出的一帧图像
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  index: u64,
  name: String,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64, name: impl Into<String>) -> Self {
    Self {
      image,
      index,
      name: name.into(),
    }
  }

  /// 不带图像内容的空白帧，检测结果完全由外部提供时使用
  pub fn blank(index: u64, name: impl Into<String>) -> Self {
    Self::new(RgbImage::new(1, 1), index, name)
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  /// 帧在输入流中的序号，从 0 开始
  pub fn index(&self) -> u64 {
    self.index
  }

  /// 帧名称，图像文件输入时为文件名
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}
