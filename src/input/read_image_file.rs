// 该文件是 Dianming （点名） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid repeat count: {0}")]
  InvalidRepeat(String),
}

/// 单张图像作为输入，可通过 `?repeat=N` 重复产出 N 帧（默认 1 帧）
pub struct ImageFileInput {
  image: RgbImage,
  name: String,
  remaining: u64,
  index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let repeat = match url.query_pairs().find(|(k, _)| k == "repeat") {
      Some((_, v)) => v
        .parse::<u64>()
        .map_err(|_| ImageFileInputError::InvalidRepeat(v.to_string()))?,
      None => 1,
    };

    let path = Path::new(url.path());
    let image = ImageReader::open(path)?.decode()?.into_rgb8();
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    info!(
      "图像已打开: {} ({}x{}), 重复 {} 次",
      path.display(),
      image.width(),
      image.height(),
      repeat
    );

    Ok(ImageFileInput {
      image,
      name,
      remaining: repeat,
      index: 0,
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<Frame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    let frame = Frame::new(self.image.clone(), self.index, self.name.clone());
    self.index += 1;
    Some(Ok(frame))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn image_url(path: &Path, query: &str) -> Url {
    Url::parse(&format!("image://{}{}", path.display(), query)).unwrap()
  }

  #[test]
  fn repeats_the_same_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    RgbImage::new(4, 3).save(&path).unwrap();

    let input = ImageFileInput::from_url(&image_url(&path, "?repeat=3")).unwrap();
    let frames: Vec<_> = input.map(|f| f.unwrap()).collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].index(), 2);
    assert_eq!(frames[0].name(), "still.png");
    assert_eq!((frames[0].width(), frames[0].height()), (4, 3));
  }

  #[test]
  fn missing_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let url = image_url(&dir.path().join("absent.png"), "");
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }
}
