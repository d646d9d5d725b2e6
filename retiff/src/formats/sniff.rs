// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Bytes needed by [`ContainerFormat::detect`]
pub const SNIFF_LEN: usize = 16;

/// Image container formats recognized by their magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
  Tiff,
  BigTiff,
  Png,
  Jpeg,
  Gif,
  Bmp,
  Webp,
  Ico,
}

impl ContainerFormat {
  pub fn detect(buf: &[u8]) -> Option<Self> {
    if buf.len() < 4 {
      return None;
    }
    match buf {
      [0x49, 0x49, 42, 0, ..] | [0x4d, 0x4d, 0, 42, ..] => Some(Self::Tiff),
      [0x49, 0x49, 43, 0, ..] | [0x4d, 0x4d, 0, 43, ..] => Some(Self::BigTiff),
      [0x89, b'P', b'N', b'G', ..] => Some(Self::Png),
      [0xff, 0xd8, 0xff, ..] => Some(Self::Jpeg),
      [b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
      [b'B', b'M', ..] => Some(Self::Bmp),
      [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
      [0, 0, 1, 0, ..] => Some(Self::Ico),
      _ => None,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Tiff => "TIFF",
      Self::BigTiff => "BigTIFF",
      Self::Png => "PNG",
      Self::Jpeg => "JPEG",
      Self::Gif => "GIF",
      Self::Bmp => "BMP",
      Self::Webp => "WebP",
      Self::Ico => "ICO",
    }
  }
}

impl Display for ContainerFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}
