// 该文件是 Shumu （数目） 项目的一部分。
// src/output/draw.rs - 检测结果排序与编号标注
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

//! 检测框排序与编号。
//!
//! 排序规则：先按边框中心的 x 坐标升序，再按中心的 y 坐标升序，相同的保持输入顺序。
//! 这只是近似的从左到右阅读顺序，并不按行分组。
//!
//! 每个检测框依次绘制：边框、左上角的背景板（文字尺寸加四周 6 像素留白）、编号文字。
//! 标注直接覆盖原图像素，相邻背景板允许重叠。

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::debug;

use crate::model::DetectItem;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 22.0;
const LABEL_PADDING: u32 = 6;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 编号所用字体，抗锯齿渲染
pub struct LabelFont {
  font: FontArc,
  scale: PxScale,
}

impl LabelFont {
  /// 内置的 DejaVu Sans
  pub fn bundled() -> Result<Self, DrawError> {
    Ok(Self::with_font(FontArc::try_from_slice(BUNDLED_FONT)?))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DrawError> {
    Self::from_bytes(std::fs::read(path)?)
  }

  pub fn from_bytes(data: Vec<u8>) -> Result<Self, DrawError> {
    Ok(Self::with_font(FontArc::try_from_vec(data)?))
  }

  fn with_font(font: FontArc) -> Self {
    Self {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  /// 文本占用的像素尺寸 (宽, 高)
  pub fn text_size(&self, text: &str) -> (u32, u32) {
    text_size(self.scale, &self.font, text)
  }

  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    draw_text_mut(image, color, x, y, self.scale, &self.font, text);
  }
}

/// 带有 1 起始编号的检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedItem<'a> {
  pub rank: usize,
  pub item: &'a DetectItem,
}

/// 按边框中心 (x, y) 升序排序并编号，排序是稳定的
pub fn rank_detections(items: &[DetectItem]) -> Vec<RankedItem<'_>> {
  let mut sorted: Vec<&DetectItem> = items.iter().collect();
  sorted.sort_by(|a, b| {
    let (ax, ay) = a.midpoint();
    let (bx, by) = b.midpoint();
    ax.total_cmp(&bx).then(ay.total_cmp(&by))
  });

  sorted
    .into_iter()
    .enumerate()
    .map(|(idx, item)| RankedItem {
      rank: idx + 1,
      item,
    })
    .collect()
}

pub struct Draw {
  font: LabelFont,
  padding: u32,
  box_color: Rgb<u8>,
  text_color: Rgb<u8>,
}

impl Draw {
  pub fn new(font: LabelFont) -> Self {
    Self {
      font,
      padding: LABEL_PADDING,
      box_color: Rgb(BOX_COLOR),
      text_color: Rgb(TEXT_COLOR),
    }
  }

  /// 在图像上绘制排序后的编号，返回检测数量
  pub fn draw_detections(&self, image: &mut RgbImage, items: &[DetectItem]) -> usize {
    let ranked = rank_detections(items);
    for entry in &ranked {
      self.draw_ranked(image, entry);
    }
    debug!("标注完成: {} 个目标", ranked.len());
    ranked.len()
  }

  fn draw_ranked(&self, image: &mut RgbImage, entry: &RankedItem<'_>) {
    let [x1, y1, x2, y2] = entry.item.bbox.map(|v| v as i32);

    // 绘制边框（加粗为2像素）
    for thickness in 0..BOX_THICKNESS {
      let width = x2 - x1 + 1 - 2 * thickness;
      let height = y2 - y1 + 1 - 2 * thickness;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x1 + thickness, y1 + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, self.box_color);
    }

    // 左上角背景板
    let label = entry.rank.to_string();
    let (text_width, text_height) = self.font.text_size(&label);
    let plate = Rect::at(x1, y1).of_size(
      text_width + 2 * self.padding,
      text_height + 2 * self.padding,
    );
    draw_filled_rect_mut(image, plate, self.box_color);

    // 编号文字
    let pad = self.padding as i32;
    self
      .font
      .draw_text(image, self.text_color, x1 + pad, y1 + pad, &label);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draw() -> Draw {
    Draw::new(LabelFont::bundled().unwrap())
  }

  /// 以中心点 (cx, cy) 构造 10x10 的检测框
  fn centered(cx: f32, cy: f32) -> DetectItem {
    DetectItem::new(0, 0.9, [cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0])
  }

  fn ranks_of(items: &[DetectItem]) -> Vec<usize> {
    let ranked = rank_detections(items);
    items
      .iter()
      .map(|item| {
        ranked
          .iter()
          .find(|r| std::ptr::eq(r.item, item))
          .map(|r| r.rank)
          .unwrap()
      })
      .collect()
  }

  #[test]
  fn ranks_follow_horizontal_midpoint() {
    let items = vec![
      centered(90.0, 5.0),
      centered(10.0, 80.0),
      centered(50.0, 40.0),
      centered(30.0, 0.0),
    ];
    assert_eq!(ranks_of(&items), vec![4, 1, 3, 2]);
  }

  #[test]
  fn equal_x_falls_back_to_vertical_midpoint() {
    let items = vec![
      centered(20.0, 70.0),
      centered(20.0, 10.0),
      centered(20.0, 40.0),
    ];
    assert_eq!(ranks_of(&items), vec![3, 1, 2]);
  }

  #[test]
  fn full_ties_keep_input_order() {
    let items = vec![
      DetectItem::new(0, 0.9, [0.0, 0.0, 20.0, 20.0]),
      DetectItem::new(1, 0.8, [5.0, 5.0, 15.0, 15.0]),
      DetectItem::new(2, 0.7, [8.0, 8.0, 12.0, 12.0]),
    ];
    let ranked = rank_detections(&items);
    let classes: Vec<u32> = ranked.iter().map(|r| r.item.class_id).collect();
    assert_eq!(classes, vec![0, 1, 2]);
    assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
  }

  #[test]
  fn ordering_is_not_row_aware() {
    // (10,10) -> 1, (30,60) -> 2, (50,10) -> 3
    let items = vec![centered(10.0, 10.0), centered(50.0, 10.0), centered(30.0, 60.0)];
    assert_eq!(ranks_of(&items), vec![1, 3, 2]);
  }

  #[test]
  fn zero_detections_leave_image_untouched() {
    let original = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, 7]));
    let mut image = original.clone();
    let count = draw().draw_detections(&mut image, &[]);
    assert_eq!(count, 0);
    assert_eq!(image, original);
  }

  #[test]
  fn annotation_is_deterministic() {
    let original = RgbImage::from_fn(160, 120, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 40]));
    let items = vec![
      DetectItem::new(0, 0.9, [80.0, 10.0, 140.0, 60.0]),
      DetectItem::new(0, 0.8, [5.0, 50.0, 60.0, 110.0]),
      DetectItem::new(0, 0.75, [70.0, 70.0, 100.0, 115.0]),
    ];
    let draw = draw();

    let mut first = original.clone();
    let mut second = original.clone();
    assert_eq!(draw.draw_detections(&mut first, &items), 3);
    assert_eq!(draw.draw_detections(&mut second, &items), 3);

    assert_eq!(first.as_raw(), second.as_raw());
    assert_ne!(first, original);
    assert_eq!(rank_detections(&items), rank_detections(&items));
  }

  #[test]
  fn draws_outline_plate_and_label() {
    let mut image = RgbImage::new(100, 100);
    let items = vec![DetectItem::new(0, 0.9, [20.0, 20.0, 80.0, 80.0])];
    let draw = draw();
    draw.draw_detections(&mut image, &items);

    let blue = Rgb(BOX_COLOR);
    let black = Rgb([0, 0, 0]);

    // 边框
    assert_eq!(image.get_pixel(80, 50), &blue);
    assert_eq!(image.get_pixel(79, 50), &blue);
    assert_eq!(image.get_pixel(50, 80), &blue);
    assert_eq!(image.get_pixel(78, 50), &black);

    // 背景板为文字尺寸加四周留白
    let (text_width, text_height) = draw.font.text_size("1");
    assert!(text_width > 0 && text_height > 0);
    let plate_right = 20 + text_width + 2 * LABEL_PADDING - 1;
    let plate_bottom = 20 + text_height + 2 * LABEL_PADDING - 1;
    assert!(plate_right + 2 < 78 && plate_bottom + 2 < 78);
    assert_eq!(image.get_pixel(22, 22), &blue);
    assert_eq!(image.get_pixel(plate_right, plate_bottom), &blue);
    assert_eq!(image.get_pixel(plate_right + 2, plate_bottom + 2), &black);

    // 白色编号（抗锯齿，边缘为混合色）
    let pad = LABEL_PADDING;
    let text_pixels: Vec<&Rgb<u8>> = (20 + pad..20 + pad + text_width)
      .flat_map(|x| (20 + pad..20 + pad + text_height).map(move |y| (x, y)))
      .map(|(x, y)| image.get_pixel(x, y))
      .collect();
    assert!(text_pixels.iter().any(|p| p[0] > 200 && p[1] > 200));
    assert!(text_pixels.iter().any(|p| p[0] > 0 && p[0] < 200));

    // 框内部未被覆盖
    assert_eq!(image.get_pixel(60, 60), &black);
  }

  #[test]
  fn boxes_outside_image_are_clipped() {
    let mut image = RgbImage::new(32, 32);
    let items = vec![
      DetectItem::new(0, 0.9, [-10.0, -10.0, 50.0, 50.0]),
      DetectItem::new(0, 0.9, [28.0, 28.0, 31.0, 31.0]),
    ];
    assert_eq!(draw().draw_detections(&mut image, &items), 2);
  }

  #[test]
  fn wider_labels_for_more_digits() {
    let font = LabelFont::bundled().unwrap();
    let (one, height) = font.text_size("1");
    let (twelve, _) = font.text_size("12");
    assert!(height > 0);
    assert!(twelve > one);
  }

  #[test]
  fn font_override_loads_from_file() {
    let path = std::env::temp_dir().join(format!("shumu-font-{}.ttf", std::process::id()));
    std::fs::write(&path, BUNDLED_FONT).unwrap();
    let font = LabelFont::from_file(&path).unwrap();
    assert_eq!(font.text_size("7"), LabelFont::bundled().unwrap().text_size("7"));
    let _ = std::fs::remove_file(path);

    assert!(matches!(
      LabelFont::from_file("/nonexistent/shumu.ttf"),
      Err(DrawError::IoError(_))
    ));
  }

  #[test]
  fn invalid_font_bytes_are_rejected() {
    assert!(matches!(
      LabelFont::from_bytes(vec![0u8; 16]),
      Err(DrawError::InvalidFont(_))
    ));
  }
}
