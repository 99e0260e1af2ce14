// 该文件是 Shumu （数目） 项目的一部分。
// src/output/report.rs - 计数结果组装
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

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  JPEG_QUALITY, TARGET_COUNT,
  input::Frame,
  model::DetectResult,
  output::{Render, draw::Draw},
};

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("JPEG 编码失败: {0}")]
  EncodeError(#[from] image::ImageError),
}

/// 计数状态颜色，序列化为 `#RRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusColour {
  /// 数量正好
  #[serde(rename = "#00ff00ff")]
  Ok,
  /// 数量过多
  #[serde(rename = "#ffe000ff")]
  Warning,
  /// 数量不足
  #[serde(rename = "#ff0000ff")]
  Deficit,
}

impl StatusColour {
  pub fn from_difference(difference: i64) -> Self {
    if difference > 0 {
      StatusColour::Warning
    } else if difference == 0 {
      StatusColour::Ok
    } else {
      StatusColour::Deficit
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      StatusColour::Ok => "#00ff00ff",
      StatusColour::Warning => "#ffe000ff",
      StatusColour::Deficit => "#ff0000ff",
    }
  }
}

/// 一次采集周期的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountReport {
  /// 期望数量
  pub set_num: u32,
  /// 检测到的数量
  pub num_obj: u32,
  /// num_obj - set_num
  pub num_difference: i64,
  pub colour: StatusColour,
  /// 标注后图像的 JPEG 数据，标准 base64，无 data URI 前缀
  pub img: String,
}

impl CountReport {
  pub fn assemble(
    set_num: u32,
    num_obj: u32,
    image: &RgbImage,
    quality: u8,
  ) -> Result<Self, ReportError> {
    let num_difference = i64::from(num_obj) - i64::from(set_num);
    let colour = StatusColour::from_difference(num_difference);
    let img = encode_jpeg_base64(image, quality)?;
    Ok(Self {
      set_num,
      num_obj,
      num_difference,
      colour,
      img,
    })
  }
}

pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String, ReportError> {
  let mut buffer = Vec::new();
  let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
  image.write_with_encoder(encoder)?;
  debug!("JPEG 编码完成: {} 字节", buffer.len());
  Ok(STANDARD.encode(&buffer))
}

/// 标注并组装计数结果
pub struct ReportRender {
  draw: Draw,
  target_count: u32,
  quality: u8,
}

impl ReportRender {
  pub fn new(draw: Draw) -> Self {
    Self {
      draw,
      target_count: TARGET_COUNT,
      quality: JPEG_QUALITY,
    }
  }
}

impl Render<Frame, DetectResult> for ReportRender {
  type Report = CountReport;
  type Error = ReportError;

  fn render_result(&self, frame: Frame, result: &DetectResult) -> Result<CountReport, ReportError> {
    let mut image = frame.image;
    let count = self.draw.draw_detections(&mut image, &result.items);
    let num_obj = u32::try_from(count).unwrap_or(u32::MAX);
    CountReport::assemble(self.target_count, num_obj, &image, self.quality)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{model::DetectItem, output::LabelFont};
  use image::Rgb;

  fn render() -> ReportRender {
    ReportRender::new(Draw::new(LabelFont::bundled().unwrap()))
  }

  fn frame() -> Frame {
    Frame {
      image: RgbImage::from_pixel(64, 48, Rgb([30, 60, 90])),
      index: 0,
    }
  }

  #[test]
  fn colour_follows_difference_sign() {
    assert_eq!(StatusColour::from_difference(2), StatusColour::Warning);
    assert_eq!(StatusColour::from_difference(0), StatusColour::Ok);
    assert_eq!(StatusColour::from_difference(-1), StatusColour::Deficit);
    assert_eq!(StatusColour::Warning.as_str(), "#ffe000ff");
    assert_eq!(StatusColour::Ok.as_str(), "#00ff00ff");
    assert_eq!(StatusColour::Deficit.as_str(), "#ff0000ff");
  }

  #[test]
  fn colour_serializes_as_hex_string() {
    assert_eq!(
      serde_json::to_string(&StatusColour::Warning).unwrap(),
      "\"#ffe000ff\""
    );
    let parsed: StatusColour = serde_json::from_str("\"#00ff00ff\"").unwrap();
    assert_eq!(parsed, StatusColour::Ok);
  }

  #[test]
  fn no_detections_is_a_deficit() {
    let report = render()
      .render_result(frame(), &DetectResult::default())
      .unwrap();
    assert_eq!(report.set_num, 1);
    assert_eq!(report.num_obj, 0);
    assert_eq!(report.num_difference, -1);
    assert_eq!(report.colour, StatusColour::Deficit);
  }

  #[test]
  fn difference_matches_counts() {
    let items = vec![
      DetectItem::new(0, 0.9, [2.0, 2.0, 20.0, 20.0]),
      DetectItem::new(0, 0.9, [30.0, 10.0, 50.0, 40.0]),
      DetectItem::new(0, 0.9, [10.0, 25.0, 25.0, 45.0]),
    ];
    let report = render()
      .render_result(frame(), &DetectResult::from(items))
      .unwrap();
    assert_eq!(report.num_obj, 3);
    assert_eq!(
      report.num_difference,
      i64::from(report.num_obj) - i64::from(report.set_num)
    );
    assert_eq!(report.colour, StatusColour::Warning);

    let single = vec![DetectItem::new(0, 0.9, [2.0, 2.0, 20.0, 20.0])];
    let report = render()
      .render_result(frame(), &DetectResult::from(single))
      .unwrap();
    assert_eq!(report.num_difference, 0);
    assert_eq!(report.colour, StatusColour::Ok);
  }

  #[test]
  fn image_is_plain_base64_jpeg() {
    let report = render()
      .render_result(frame(), &DetectResult::default())
      .unwrap();
    assert!(!report.img.starts_with("data:"));

    let bytes = STANDARD.decode(&report.img).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
  }

  #[test]
  fn report_serializes_with_wire_field_names() {
    let report = CountReport::assemble(1, 2, &RgbImage::new(8, 8), 80).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["set_num"], 1);
    assert_eq!(value["num_obj"], 2);
    assert_eq!(value["num_difference"], 1);
    assert_eq!(value["colour"], "#ffe000ff");
    assert!(value["img"].is_string());
    assert_eq!(value.as_object().unwrap().len(), 5);
  }
}
