// 该文件是 Dianming （点名） 项目的一部分。
// src/bin/attendance_list.rs - 考勤记录查询
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

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use dianming::{
  FromUrl,
  identity::{IdentityCatalog, IdentityId},
  store::{AttendanceStore, AttendanceStoreWrapper, CatalogStore, CatalogStoreWrapper},
};

/// 按时间倒序列出考勤记录
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 考勤记录存储
  #[arg(long, value_name = "ATTENDANCE")]
  pub attendance: Url,
  /// 身份目录，用于显示姓名与课程
  #[arg(long, value_name = "CATALOG")]
  pub catalog: Option<Url>,
  /// 只列出该身份的记录
  #[arg(long, value_name = "ID")]
  pub id: Option<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let store = AttendanceStoreWrapper::from_url(&args.attendance)?;
  let catalog = match &args.catalog {
    Some(url) => IdentityCatalog::new(CatalogStoreWrapper::from_url(url)?.load_all()?)?,
    None => IdentityCatalog::empty(),
  };

  let filter = args.id.map(IdentityId::from);
  let records = store.records(filter.as_ref())?;
  info!("共 {} 条考勤记录", records.len());

  for record in records {
    let Some(time) = record.time() else {
      warn!("记录 {} 的时间戳无效: {}", record.seq, record.timestamp);
      continue;
    };
    let time = time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    match catalog.find(&record.identity_id) {
      Some(identity) => println!(
        "{}\t{}\t{}\t{}",
        time, record.identity_id, identity.display_name, identity.course
      ),
      None => println!("{}\t{}", time, record.identity_id),
    }
  }

  Ok(())
}
