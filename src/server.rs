// 该文件是 Shumu （数目） 项目的一部分。
// src/server.rs - 事件流服务
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

use axum::{
  Router,
  extract::{Query, State},
  http::{HeaderName, HeaderValue},
  response::{
    IntoResponse,
    sse::{Event, Sse},
  },
  routing::get,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::info;

use crate::task::{BoxError, PipelineHandle, report_stream};

#[derive(Clone)]
pub struct AppState {
  pub pipeline: PipelineHandle,
}

impl AppState {
  pub fn new(pipeline: PipelineHandle) -> Self {
    Self { pipeline }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
  /// 前端携带的摄像头编号，仅记录
  pub camera: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/stream", get(stream_handler))
    .layer(cors_layer())
    .with_state(state)
}

/// 允许任意来源并携带凭据
///
/// 带凭据时不能使用通配符，因此来源、方法和请求头都从请求中镜像。
pub fn cors_layer() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(AllowOrigin::mirror_request())
    .allow_methods(AllowMethods::mirror_request())
    .allow_headers(AllowHeaders::mirror_request())
    .allow_credentials(true)
}

async fn stream_handler(
  State(state): State<AppState>,
  Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
  match &query.camera {
    Some(camera) => info!("新的订阅者连接 (camera = {})", camera),
    None => info!("新的订阅者连接"),
  }

  // 响应体每取走一个事件才会请求下一帧
  let stream = report_stream(state.pipeline.clone()).map(|item| -> Result<Event, BoxError> {
    let report = item?;
    Ok(Event::default().json_data(&report)?)
  });

  (
    [(
      HeaderName::from_static("x-accel-buffering"),
      HeaderValue::from_static("no"),
    )],
    Sse::new(stream),
  )
}
