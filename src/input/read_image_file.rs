// 该文件是 Shumu （数目） 项目的一部分。
// src/input/read_image_file.rs - 静态图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::Frame, url_file_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 静态图像输入：每次请求都返回同一张图像，永不结束
pub struct ImageFileInput {
  image: RgbImage,
  index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_file_path(url);
    let image = ImageReader::open(&path)?.decode()?.to_rgb8();
    info!(
      "已加载静态图像: {} ({}x{})",
      path,
      image.width(),
      image.height()
    );

    Ok(ImageFileInput::new(image))
  }
}

impl ImageFileInput {
  pub fn new(image: RgbImage) -> Self {
    Self { image, index: 0 }
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<Frame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let frame = Frame {
      image: self.image.clone(),
      index: self.index,
    };
    self.index += 1;
    Some(Ok(frame))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn static_image_never_ends() {
    let mut input = ImageFileInput::new(RgbImage::from_pixel(4, 3, Rgb([7, 8, 9])));
    for expected in 0..5 {
      let frame = input.next().unwrap().unwrap();
      assert_eq!(frame.index, expected);
      assert_eq!(frame.image.dimensions(), (4, 3));
    }
  }

  #[test]
  fn loads_image_from_url() {
    let path = std::env::temp_dir().join(format!("shumu-input-{}.png", std::process::id()));
    RgbImage::from_pixel(5, 2, Rgb([1, 2, 3])).save(&path).unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next().unwrap().unwrap();
    assert_eq!(frame.image.get_pixel(4, 1), &Rgb([1, 2, 3]));

    let _ = std::fs::remove_file(path);
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("gst://file/tmp/video.mp4").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
