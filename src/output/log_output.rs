// 该文件是 Dianming （点名） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::{cell::RefCell, convert::Infallible};

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  output::{Overlay, OutputError, Render},
  state::ModeKind,
};

/// 把每帧的状态写入日志；带 `changes` 查询参数时只在状态变化时输出
pub struct LogOutput {
  changes_only: bool,
  last: RefCell<Option<ModeKind>>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    let changes_only = url.query_pairs().any(|(k, _)| k == "changes");
    Ok(Self {
      changes_only,
      last: RefCell::new(None),
    })
  }
}

impl Render for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &Frame, overlay: &Overlay<'_>) -> Result<(), Self::Error> {
    let kind = overlay.mode.kind();
    let previous = self.last.replace(Some(kind));
    if self.changes_only && previous == Some(kind) {
      return Ok(());
    }

    let faces = overlay
      .faces
      .iter()
      .map(|face| format!("{} {}", face.decision.label(), face.decision.confidence_text()))
      .collect::<Vec<_>>()
      .join(", ");
    info!(
      "帧 {} ({}){}: 状态 {}, 计数 {}, 人脸 [{}]",
      overlay.tick,
      frame.name(),
      if overlay.fresh { "" } else { " [沿用]" },
      overlay.mode,
      overlay.counter,
      faces
    );
    if let Some(identity) = overlay.profile() {
      info!(
        "  - 身份: {} / {} / {}",
        identity.id, identity.display_name, identity.course
      );
    }
    Ok(())
  }
}
