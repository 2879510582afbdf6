// 该文件是 Dianming （点名） 项目的一部分。
// src/task.rs - 识别任务循环
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

use std::{fmt::Display, thread, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
  cadence::FrameCadence,
  config::RecognitionConfig,
  detector::Detector,
  frame::Frame,
  identity::IdentityCatalog,
  output::{Overlay, Render},
  scorer::ConfidenceScorer,
  state::{AttendanceStateMachine, ModeKind, Observed, RecognitionState, StepOutcome, WriteOutcome},
  store::AttendanceStore,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 会话统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSummary {
  /// 有效帧数
  pub ticks: u64,
  /// 实际运行检测的次数
  pub detections: u64,
  /// 读取或检测失败而丢弃的帧数
  pub dropped_frames: u64,
  pub attendance_written: u64,
  pub cooldown_denied: u64,
  pub write_failures: u64,
}

impl SessionSummary {
  fn record(&mut self, outcome: &StepOutcome) {
    match &outcome.write {
      Some(WriteOutcome::Appended(_)) => self.attendance_written += 1,
      Some(WriteOutcome::CooldownDenied { .. }) => self.cooldown_denied += 1,
      Some(WriteOutcome::Failed(_)) => self.write_failures += 1,
      None => {}
    }
  }
}

/// 单帧处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
  /// 本帧是否运行了检测
  pub active: bool,
  pub mode: ModeKind,
  pub outcome: StepOutcome,
}

/// 识别循环：隔帧检测，逐帧驱动考勤状态机并把结果交给渲染端。
///
/// 识别状态由任务独占，帧严格按顺序处理。
pub struct RecognitionTask<S> {
  catalog: IdentityCatalog,
  scorer: ConfidenceScorer,
  machine: AttendanceStateMachine,
  store: S,
  state: RecognitionState,
  cadence: FrameCadence,
  summary: SessionSummary,
  frame_number: Option<usize>,
  pace: Option<Duration>,
  handle_interrupt: bool,
}

impl<S: AttendanceStore> RecognitionTask<S> {
  pub fn new(catalog: IdentityCatalog, config: &RecognitionConfig, store: S) -> Self {
    Self {
      catalog,
      scorer: config.scorer(),
      machine: config.state_machine(),
      store,
      state: RecognitionState::new(),
      cadence: FrameCadence::new(),
      summary: SessionSummary::default(),
      frame_number: None,
      pace: None,
      handle_interrupt: false,
    }
  }

  /// 读取指定帧数后退出
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 每帧处理后等待的时间
  pub fn with_pace(mut self, pace: Option<Duration>) -> Self {
    self.pace = pace;
    self
  }

  /// 安装 Ctrl-C 处理，收到中断后结束会话
  pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
    self.handle_interrupt = enabled;
    self
  }

  pub fn state(&self) -> &RecognitionState {
    &self.state
  }

  pub fn summary(&self) -> &SessionSummary {
    &self.summary
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// 处理一个有效帧。检测失败时返回错误，此时状态与节拍都不变。
  pub fn tick<D, O>(
    &mut self,
    frame: &Frame,
    detector: &D,
    output: &O,
    now: DateTime<Utc>,
  ) -> Result<TickReport, D::Error>
  where
    D: Detector,
    O: Render,
    O::Error: Display,
  {
    let active = self.cadence.is_active_tick();
    if active {
      let observation = detector.detect(frame)?;
      self.summary.detections += 1;
      debug!("帧 {} 检测到 {} 个人脸", frame.index(), observation.len());
      self
        .cadence
        .refresh(self.scorer.score(&observation, &self.catalog));
    }

    let primary = self
      .cadence
      .latest()
      .and_then(|observation| observation.primary())
      .map(|face| &face.decision);
    let outcome = self
      .machine
      .step(&mut self.state, Observed::from(primary), &mut self.store, now);
    self.summary.record(&outcome);

    let overlay = Overlay {
      tick: self.summary.ticks,
      mode: self.state.mode(),
      counter: self.state.counter(),
      faces: self
        .cadence
        .latest()
        .map(|observation| &observation.faces[..])
        .unwrap_or(&[]),
      fresh: self.cadence.is_fresh(),
    };
    if let Err(e) = output.render_result(frame, &overlay) {
      warn!("渲染失败: {}", e);
    }

    self.cadence.advance();
    self.summary.ticks += 1;

    Ok(TickReport {
      active,
      mode: self.state.mode().kind(),
      outcome,
    })
  }
}

impl<S, I, IE, D, O> Task<I, D, O> for RecognitionTask<S>
where
  S: AttendanceStore,
  I: Iterator<Item = Result<Frame, IE>>,
  IE: Display,
  D: Detector,
  D::Error: Display,
  O: Render,
  O::Error: Display,
{
  type Output = SessionSummary;
  type Error = anyhow::Error;

  fn run_task(mut self, input: I, model: D, output: O) -> Result<Self::Output, Self::Error> {
    info!(
      "开始识别任务, 已知身份 {} 个, 匹配阈值 {}",
      self.catalog.len(),
      self.scorer.threshold()
    );

    let interrupt = if self.handle_interrupt {
      let (tx, rx) = std::sync::mpsc::channel();
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
      Some(rx)
    } else {
      None
    };

    let mut frames_read = 0usize;
    for item in input {
      frames_read += 1;
      match item {
        Ok(frame) => {
          if let Err(e) = self.tick(&frame, &model, &output, Utc::now()) {
            warn!("帧 {} 检测失败，跳过: {}", frame.index(), e);
            self.summary.dropped_frames += 1;
          }
        }
        Err(e) => {
          warn!("帧读取失败，跳过: {}", e);
          self.summary.dropped_frames += 1;
        }
      }

      if self.frame_number.is_some_and(|n| frames_read >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frames_read);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      if let Some(pace) = self.pace {
        thread::sleep(pace);
      }
    }

    let summary = self.summary;
    info!(
      "任务完成: 有效帧 {}, 检测 {} 次, 丢弃 {} 帧, 考勤写入 {} 次, 冷却拒绝 {} 次, 写入失败 {} 次",
      summary.ticks,
      summary.detections,
      summary.dropped_frames,
      summary.attendance_written,
      summary.cooldown_denied,
      summary.write_failures
    );
    Ok(summary)
  }
}
