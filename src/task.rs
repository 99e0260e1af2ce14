// 该文件是 Shumu （数目） 项目的一部分。
// src/task.rs - 计数流水线与处理线程
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

//! 一次采集周期：取帧 → 推理 → 排序标注 → 组装结果。
//!
//! 帧来源、模型和渲染器都由单独的处理线程持有，在线程内构造，随线程退出而释放。
//! 订阅者通过 [`PipelineHandle`] 请求下一次结果，多个订阅者的请求按到达顺序串行处理。
//! 每个订阅者的 [`report_stream`] 由响应体拉取驱动。

use std::{error::Error as StdError, thread, time::Instant};

use futures_util::{Stream, stream};
use image::RgbImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
  input::Frame,
  model::{DetectResult, Model},
  output::{CountReport, Render},
};

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("帧来源已结束")]
  EndOfStream,
  #[error("读取帧失败: {0}")]
  Input(BoxError),
  #[error("推理失败: {0}")]
  Model(BoxError),
  #[error("渲染失败: {0}")]
  Render(BoxError),
  #[error("处理线程已停止")]
  WorkerStopped,
}

/// 能够逐次产生计数结果的对象
pub trait Produce {
  fn produce(&mut self) -> Result<CountReport, PipelineError>;
}

pub struct CountingPipeline<I, M, O> {
  input: I,
  model: M,
  render: O,
}

impl<I, M, O> CountingPipeline<I, M, O> {
  pub fn new(input: I, model: M, render: O) -> Self {
    Self {
      input,
      model,
      render,
    }
  }
}

impl<I, IE, M, ME, O, RE> Produce for CountingPipeline<I, M, O>
where
  I: Iterator<Item = Result<Frame, IE>>,
  IE: StdError + Send + Sync + 'static,
  M: Model<Input = RgbImage, Output = DetectResult, Error = ME>,
  ME: StdError + Send + Sync + 'static,
  O: Render<Frame, DetectResult, Report = CountReport, Error = RE>,
  RE: StdError + Send + Sync + 'static,
{
  fn produce(&mut self) -> Result<CountReport, PipelineError> {
    let frame = self
      .input
      .next()
      .ok_or(PipelineError::EndOfStream)?
      .map_err(|e| PipelineError::Input(Box::new(e)))?;
    debug!("处理第 {} 帧图像", frame.index);

    let now = Instant::now();
    let result = self
      .model
      .infer(&frame.image)
      .map_err(|e| PipelineError::Model(Box::new(e)))?;
    let infer_elapsed = now.elapsed();

    let report = self
      .render
      .render_result(frame, &result)
      .map_err(|e| PipelineError::Render(Box::new(e)))?;
    debug!(
      "推理完成，耗时: {:.2?} / {:.2?}，目标数量: {}",
      infer_elapsed,
      now.elapsed(),
      report.num_obj
    );

    Ok(report)
  }
}

type Reply = oneshot::Sender<Result<CountReport, PipelineError>>;

/// 处理线程的请求端，可以被多个订阅者克隆共享
#[derive(Clone)]
pub struct PipelineHandle {
  requests: mpsc::Sender<Reply>,
}

impl PipelineHandle {
  /// 请求一次完整的采集周期
  pub async fn next_report(&self) -> Result<CountReport, PipelineError> {
    let (reply, response) = oneshot::channel();
    self
      .requests
      .send(reply)
      .await
      .map_err(|_| PipelineError::WorkerStopped)?;
    response.await.map_err(|_| PipelineError::WorkerStopped)?
  }
}

/// 启动处理线程
///
/// `factory` 在线程内执行，因此帧来源和模型不需要实现 `Send`。
/// 构造失败时返回其错误；所有 [`PipelineHandle`] 被释放后线程退出。
pub async fn spawn_pipeline<P, F>(factory: F) -> anyhow::Result<PipelineHandle>
where
  P: Produce,
  F: FnOnce() -> anyhow::Result<P> + Send + 'static,
{
  let (requests, mut pending) = mpsc::channel::<Reply>(16);
  let (ready_tx, ready_rx) = oneshot::channel::<anyhow::Result<()>>();

  thread::Builder::new()
    .name("shumu-pipeline".to_string())
    .spawn(move || {
      let mut pipeline = match factory() {
        Ok(pipeline) => {
          let _ = ready_tx.send(Ok(()));
          pipeline
        }
        Err(e) => {
          let _ = ready_tx.send(Err(e));
          return;
        }
      };
      info!("处理线程已就绪");

      while let Some(reply) = pending.blocking_recv() {
        if reply.is_closed() {
          debug!("请求方已断开，跳过本次采集");
          continue;
        }
        let result = pipeline.produce();
        if let Err(e) = &result {
          warn!("采集周期失败: {}", e);
        }
        let _ = reply.send(result);
      }

      info!("处理线程退出，释放帧来源与模型");
    })?;

  ready_rx
    .await
    .map_err(|_| anyhow::anyhow!("处理线程启动失败"))??;

  Ok(PipelineHandle { requests })
}

/// 单个订阅者的结果流
///
/// 只有在上一条结果被取走之后才请求下一帧，因此第 N+1 帧要等第 N 帧发布完成才会读取。
/// 流被丢弃（客户端断开）时不再请求；流水线出错时产生一个错误项后结束。
pub fn report_stream(
  handle: PipelineHandle,
) -> impl Stream<Item = Result<CountReport, PipelineError>> + Send + 'static {
  let subscription = Subscription {
    handle,
    finished: false,
  };

  stream::unfold(Some(subscription), |state| async move {
    let Some(mut subscription) = state else {
      return None;
    };
    match subscription.handle.next_report().await {
      Ok(report) => Some((Ok(report), Some(subscription))),
      Err(e) => {
        match &e {
          PipelineError::EndOfStream => info!("帧来源已结束，关闭事件流"),
          _ => error!("流水线错误，关闭事件流: {}", e),
        }
        subscription.finished = true;
        Some((Err(e), None))
      }
    }
  })
}

struct Subscription {
  handle: PipelineHandle,
  finished: bool,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if !self.finished {
      info!("客户端已断开，停止推送");
    }
  }
}
