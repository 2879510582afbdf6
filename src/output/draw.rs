// 该文件是 Dianming （点名） 项目的一部分。
// src/output/draw.rs - 识别状态可视化
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

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::{detector::FaceRegion, output::Overlay, state::ModeKind};

const KNOWN_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOX_THICKNESS: u32 = 2;
const LABEL_STRIP_HEIGHT: u32 = 35;
const BANNER_HEIGHT: u32 = 12;

/// 状态横幅颜色
pub fn mode_color(kind: ModeKind) -> [u8; 3] {
  match kind {
    ModeKind::Waiting => [128, 128, 128],
    ModeKind::Found => [0, 128, 255],
    ModeKind::Unknown => UNKNOWN_COLOR,
    ModeKind::Marked => KNOWN_COLOR,
    ModeKind::AlreadyMarked => [255, 165, 0],
  }
}

pub struct Draw {
  known_color: [u8; 3],
  unknown_color: [u8; 3],
  box_thickness: u32,
  label_strip_height: u32,
  banner_height: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      known_color: KNOWN_COLOR,
      unknown_color: UNKNOWN_COLOR,
      box_thickness: BOX_THICKNESS,
      label_strip_height: LABEL_STRIP_HEIGHT,
      banner_height: BANNER_HEIGHT,
    }
  }
}

impl Draw {
  pub fn draw_overlay(&self, image: &mut RgbImage, overlay: &Overlay<'_>) {
    for (index, face) in overlay.faces.iter().enumerate() {
      let color = if face.decision.is_known() {
        self.known_color
      } else {
        self.unknown_color
      };
      // 主人脸加粗
      let thickness = if index == 0 {
        self.box_thickness + 1
      } else {
        self.box_thickness
      };
      self.draw_face(image, &face.region, color, thickness);
    }
    self.draw_banner(image, overlay.mode.kind());
  }

  // 边框加底部标签条，坐标裁剪到图像范围内
  fn draw_face(&self, image: &mut RgbImage, region: &FaceRegion, color: [u8; 3], thickness: u32) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
      return;
    }
    let x_min = region.bbox[0].min(w - 1);
    let y_min = region.bbox[1].min(h - 1);
    let x_max = region.bbox[2].min(w - 1);
    let y_max = region.bbox[3].min(h - 1);
    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let width = x_max - x_min + 1;
    let height = y_max - y_min + 1;
    for t in 0..thickness {
      if width <= 2 * t || height <= 2 * t {
        break;
      }
      let rect = Rect::at((x_min + t) as i32, (y_min + t) as i32).of_size(width - 2 * t, height - 2 * t);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }

    let strip = self.label_strip_height.min(height);
    let rect = Rect::at(x_min as i32, (y_max + 1 - strip) as i32).of_size(width, strip);
    draw_filled_rect_mut(image, rect, Rgb(color));
  }

  fn draw_banner(&self, image: &mut RgbImage, kind: ModeKind) {
    let (w, h) = image.dimensions();
    let banner = self.banner_height.min(h);
    if w == 0 || banner == 0 {
      return;
    }
    let rect = Rect::at(0, 0).of_size(w, banner);
    draw_filled_rect_mut(image, rect, Rgb(mode_color(kind)));
  }
}

/// 与保存的图像同名的文本记录
pub struct Record;

impl Record {
  pub fn record(&self, overlay: &Overlay<'_>, path: &std::path::Path) -> Result<(), std::io::Error> {
    let mut lines = vec![format!("{}, {}", overlay.mode, overlay.counter)];
    for face in overlay.faces.iter() {
      let [x_min, y_min, x_max, y_max] = face.region.bbox;
      lines.push(format!(
        "{}, {}, {}, {}, {}, {}",
        face.decision.label(),
        face.decision.confidence_text(),
        x_min,
        y_min,
        x_max,
        y_max
      ));
    }
    std::fs::write(path.with_extension("txt"), lines.join("\n"))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    identity::Identity,
    scorer::{LabeledFace, MatchDecision},
    state::Mode,
  };

  fn face(region: FaceRegion, known: bool) -> LabeledFace {
    LabeledFace {
      region,
      decision: MatchDecision {
        identity: known.then(|| Arc::new(Identity::new("s001", "Alice", "CS", vec![0.0]))),
        distance: 0.3,
        confidence_pct: 99.3,
      },
    }
  }

  #[test]
  fn draws_boxes_and_banner() {
    let mut image = RgbImage::new(100, 100);
    let faces = [
      face(FaceRegion::new(10, 20, 50, 90), true),
      face(FaceRegion::new(60, 20, 90, 90), false),
    ];
    let mode = Mode::Unknown;
    let overlay = Overlay {
      tick: 0,
      mode: &mode,
      counter: 0,
      faces: &faces,
      fresh: true,
    };
    Draw::default().draw_overlay(&mut image, &overlay);

    assert_eq!(image.get_pixel(10, 30), &Rgb(KNOWN_COLOR));
    assert_eq!(image.get_pixel(60, 30), &Rgb(UNKNOWN_COLOR));
    // 标签条
    assert_eq!(image.get_pixel(30, 80), &Rgb(KNOWN_COLOR));
    // 框内部不填充
    assert_eq!(image.get_pixel(30, 40), &Rgb([0, 0, 0]));
    assert_eq!(image.get_pixel(50, 5), &Rgb(mode_color(ModeKind::Unknown)));
  }

  #[test]
  fn degenerate_regions_are_ignored() {
    let mut image = RgbImage::new(20, 20);
    let faces = [face(FaceRegion::new(15, 15, 15, 30), true)];
    let mode = Mode::Waiting;
    let overlay = Overlay {
      tick: 0,
      mode: &mode,
      counter: 0,
      faces: &faces,
      fresh: false,
    };
    Draw::default().draw_overlay(&mut image, &overlay);
    assert_eq!(image.get_pixel(15, 18), &Rgb([0, 0, 0]));
  }
}
