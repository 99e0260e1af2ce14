// 该文件是 Shumu （数目） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use shumu::{
  FromUrl,
  input::InputWrapper,
  model::Yolo26Builder,
  output::{Draw, LabelFont, ReportRender},
  server::{AppState, create_router},
  task::{CountingPipeline, spawn_pipeline},
};

/// 优先使用 `--font` 指定的字体，加载失败时退回内置字体
fn load_font(path: Option<&Path>) -> Result<LabelFont> {
  if let Some(path) = path {
    match LabelFont::from_file(path) {
      Ok(font) => {
        info!("已加载字体: {}", path.display());
        return Ok(font);
      }
      Err(e) => warn!("字体 {} 加载失败 ({})，使用内置字体", path.display(), e),
    }
  }
  LabelFont::bundled().context("内置字体加载失败")
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);

  let font = load_font(args.font.as_deref())?;
  let model_url = args.model.clone();
  let input_url = args.input.clone();

  let pipeline = spawn_pipeline(move || {
    let model = Yolo26Builder::from_url(&model_url)?
      .build()
      .context("模型加载失败")?;
    let input = InputWrapper::from_url(&input_url).context("输入来源打开失败")?;
    let render = ReportRender::new(Draw::new(font));
    Ok(CountingPipeline::new(input, model, render))
  })
  .await?;

  let app = create_router(AppState::new(pipeline));

  let addr = format!("{}:{}", args.host, args.port);
  let listener = tokio::net::TcpListener::bind(&addr)
    .await
    .with_context(|| format!("无法监听 {}", addr))?;
  info!("事件流服务已启动: http://{}/stream", addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("服务已关闭");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("无法监听中断信号: {}", e);
    std::future::pending::<()>().await;
  }
  info!("收到中断信号，准备退出...");

  // 仍有订阅者连接时，等待 30 秒后强制退出
  std::thread::spawn(|| {
    std::thread::sleep(Duration::from_secs(30));
    warn!("强制退出程序");
    std::process::exit(1);
  });
}
