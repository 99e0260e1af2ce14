// 该文件是 Shumu （数目） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测结果，bbox 为原图像素坐标
#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn new(class_id: u32, score: f32, bbox: [f32; 4]) -> Self {
    Self {
      class_id,
      score,
      bbox,
    }
  }

  /// 边框中心点 (x, y)
  pub fn midpoint(&self) -> (f32, f32) {
    (
      (self.bbox[0] + self.bbox[2]) * 0.5,
      (self.bbox[1] + self.bbox[3]) * 0.5,
    )
  }

  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
  }

  /// 将归一化坐标映射到 `width` x `height` 的像素坐标
  pub fn scaled(mut self, width: f32, height: f32) -> Self {
    self.bbox = [
      self.bbox[0] * width,
      self.bbox[1] * height,
      self.bbox[2] * width,
      self.bbox[3] * height,
    ];
    self
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub mod nms;

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn midpoint_is_box_center() {
    let item = DetectItem::new(0, 0.9, [10.0, 20.0, 30.0, 60.0]);
    assert_eq!(item.midpoint(), (20.0, 40.0));
    assert_eq!(item.area(), 800.0);
  }

  #[test]
  fn scaled_maps_normalized_box_to_pixels() {
    let item = DetectItem::new(0, 0.9, [0.25, 0.5, 0.5, 1.0]).scaled(640.0, 480.0);
    assert_eq!(item.bbox, [160.0, 240.0, 320.0, 480.0]);
  }
}
