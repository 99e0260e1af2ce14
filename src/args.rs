// 该文件是 Shumu （数目） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Shumu 目标计数服务
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型，例如 yolo26:///path/to/model.rknn?classes=1
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - 视频文件: gst://file/path/to/video.mp4
  /// - 摄像头: gst://camera/dev/video0?width=1280&height=720&fps=15
  /// - 静态图像: image:///path/to/image.jpg
  #[arg(long, value_name = "SOURCE", verbatim_doc_comment)]
  pub input: Url,

  /// 监听地址
  #[arg(long, default_value = "0.0.0.0")]
  pub host: String,

  /// 监听端口
  #[arg(long, default_value_t = 8000)]
  pub port: u16,

  /// 编号所用的 TrueType 字体，缺省或加载失败时使用内置的 DejaVu Sans
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
}
