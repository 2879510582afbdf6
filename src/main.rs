// 该文件是 Dianming （点名） 项目的一部分。
// src/main.rs - 考勤识别主程序
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

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use dianming::{
  FromUrl,
  config::RecognitionConfig,
  cooldown::DEFAULT_COOLDOWN_SECONDS,
  detector::DetectorWrapper,
  identity::IdentityCatalog,
  input::InputWrapper,
  output::OutputWrapper,
  scorer::DEFAULT_MATCH_THRESHOLD,
  state::{DEFAULT_ACCEPT_COUNTER, DEFAULT_RESET_COUNTER},
  store::{AttendanceStoreWrapper, CatalogStore, CatalogStoreWrapper},
  task::{RecognitionTask, Task},
};

/// Dianming 考勤识别参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，例如 image:///path/a.png?repeat=10 或 folder:///path/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 人脸检测与特征提取，例如 replay:///path/detections.json
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,
  /// 身份目录，例如 json:///path/catalog.json
  #[arg(long, value_name = "CATALOG")]
  pub catalog: Url,
  /// 考勤记录存储，例如 jsonl:///path/attendance.jsonl 或 memory:
  #[arg(long, value_name = "ATTENDANCE")]
  pub attendance: Url,
  /// 输出，例如 log: 或 folder:///path/records?record
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 特征距离接受阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD, value_name = "THRESHOLD")]
  pub threshold: f64,
  /// 写入考勤前需要的连续确认帧数
  #[arg(long, default_value_t = DEFAULT_ACCEPT_COUNTER, value_name = "COUNT")]
  pub accept_counter: u32,
  /// 确认会话的最大帧数
  #[arg(long, default_value_t = DEFAULT_RESET_COUNTER, value_name = "COUNT")]
  pub reset_counter: u32,
  /// 同一身份两次考勤的最小间隔（秒）
  #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECONDS, value_name = "SECONDS")]
  pub cooldown_seconds: i64,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
  /// 每帧处理后等待的毫秒数
  #[arg(long, value_name = "MILLISECONDS")]
  pub pace_ms: Option<u64>,
}

impl Args {
  fn config(&self) -> RecognitionConfig {
    RecognitionConfig {
      threshold: self.threshold,
      accept_counter: self.accept_counter,
      reset_counter: self.reset_counter,
      cooldown_seconds: self.cooldown_seconds,
    }
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = args.config().validate()?;

  info!("输入来源: {}", args.input);
  info!("检测器: {}", args.detector);
  info!("身份目录: {}", args.catalog);
  info!("考勤存储: {}", args.attendance);
  info!("输出路径: {}", args.output);
  info!("识别参数: {:?}", config);

  let catalog = CatalogStoreWrapper::from_url(&args.catalog)?.load_all()?;
  let catalog = IdentityCatalog::new(catalog)?;
  info!("已加载 {} 个身份", catalog.len());

  let store = AttendanceStoreWrapper::from_url(&args.attendance)?;
  let input = InputWrapper::from_url(&args.input)?;
  let detector = DetectorWrapper::from_url(&args.detector)?;
  let output = OutputWrapper::from_url(&args.output)?;

  RecognitionTask::new(catalog, &config, store)
    .with_frame_number(args.frame_number)
    .with_pace(args.pace_ms.map(Duration::from_millis))
    .with_interrupt_handler(true)
    .run_task(input, detector, output)?;

  Ok(())
}
