// 该文件是 Shumu （数目） 项目的一部分。
// src/model/nms.rs - 置信度过滤与非极大值抑制
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

use tracing::debug;

use crate::model::{DetectItem, DetectResult};

/// 计算两个边界框的 IoU
pub fn iou(a: &DetectItem, b: &DetectItem) -> f32 {
  let x1 = a.bbox[0].max(b.bbox[0]);
  let y1 = a.bbox[1].max(b.bbox[1]);
  let x2 = a.bbox[2].min(b.bbox[2]);
  let y2 = a.bbox[3].min(b.bbox[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// 保留置信度不低于阈值的检测
pub fn filter_by_score(mut items: Vec<DetectItem>, threshold: f32) -> Vec<DetectItem> {
  items.retain(|item| item.score >= threshold);
  items
}

/// 非极大值抑制，只在同一类别内合并
pub fn non_max_suppression(mut items: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  // 按置信度降序排序
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result = Vec::with_capacity(items.len());

  while !items.is_empty() {
    let best = items.remove(0);
    items.retain(|det| det.class_id != best.class_id || iou(&best, det) <= iou_threshold);
    result.push(best);
  }

  result
}

/// 模型输出的通用后处理：先按置信度过滤，再做 NMS
pub fn postprocess(items: Vec<DetectItem>, confidence: f32, iou_threshold: f32) -> DetectResult {
  let candidates = items.len();
  let items = non_max_suppression(filter_by_score(items, confidence), iou_threshold);
  debug!("后处理: {} 个候选框, 保留 {} 个", candidates, items.len());
  DetectResult::from(items)
}
