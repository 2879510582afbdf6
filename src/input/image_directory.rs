// 该文件是 Dianming （点名） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入
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

use std::{collections::VecDeque, path::PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, input::is_image_path};

#[derive(Error, Debug)]
pub enum ImageDirectoryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("帧 {0} 解码失败: {1}")]
  DecodeError(String, image::ImageError),
}

/// 按文件名顺序逐帧读取目录中的图像，读取时才解码
pub struct ImageDirectoryInput {
  directory: PathBuf,
  pending: VecDeque<PathBuf>,
  index: u64,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageDirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageDirectoryInputError::SchemeMismatch);
    }
    Self::open(url.path())
  }
}

impl ImageDirectoryInput {
  pub fn open(directory: impl Into<PathBuf>) -> Result<Self, ImageDirectoryInputError> {
    let directory = directory.into();
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if path.is_file() && is_image_path(&path) {
        frames.push(path);
      }
    }
    frames.sort();
    info!(
      "图像目录已打开: {}, 共 {} 帧",
      directory.display(),
      frames.len()
    );

    Ok(Self {
      directory,
      pending: frames.into(),
      index: 0,
    })
  }

  pub fn directory(&self) -> &PathBuf {
    &self.directory
  }

  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

impl Iterator for ImageDirectoryInput {
  type Item = Result<Frame, ImageDirectoryInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.pending.pop_front()?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let index = self.index;
    self.index += 1;

    debug!("读取帧 {}: {}", index, name);
    Some(
      image::open(&path)
        .map(|image| Frame::new(image.into_rgb8(), index, name.clone()))
        .map_err(|e| ImageDirectoryInputError::DecodeError(name, e)),
    )
  }
}

#[cfg(test)]
mod tests {
  use image::RgbImage;

  use super::*;

  #[test]
  fn yields_frames_in_name_order_and_reports_bad_frames() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::new(2, 2).save(dir.path().join("0002.png")).unwrap();
    RgbImage::new(2, 2).save(dir.path().join("0001.png")).unwrap();
    std::fs::write(dir.path().join("0003.png"), b"not an image").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let url = Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let mut input = ImageDirectoryInput::from_url(&url).unwrap();
    assert_eq!(input.remaining(), 3);

    let first = input.next().unwrap().unwrap();
    assert_eq!((first.index(), first.name()), (0, "0001.png"));
    let second = input.next().unwrap().unwrap();
    assert_eq!(second.name(), "0002.png");
    assert!(matches!(
      input.next(),
      Some(Err(ImageDirectoryInputError::DecodeError(name, _))) if name == "0003.png"
    ));
    assert!(input.next().is_none());
  }

  #[test]
  fn missing_directory_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
      ImageDirectoryInput::open(dir.path().join("absent")),
      Err(ImageDirectoryInputError::IoError(_))
    ));
  }
}
