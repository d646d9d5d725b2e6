// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Storage compression of TIFF strips and tiles

use std::fmt::Display;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::{Result, RetiffError};

pub mod deflate;
pub mod lzw;
pub mod packbits;
pub mod predictor;

pub const COMPRESSION_NONE: u16 = 1;
pub const COMPRESSION_CCITT_RLE: u16 = 2;
pub const COMPRESSION_CCITT_FAX3: u16 = 3;
pub const COMPRESSION_CCITT_FAX4: u16 = 4;
pub const COMPRESSION_LZW: u16 = 5;
pub const COMPRESSION_OJPEG: u16 = 6;
pub const COMPRESSION_JPEG: u16 = 7;
pub const COMPRESSION_DEFLATE: u16 = 8;
pub const COMPRESSION_JPEG_DNG: u16 = 99;
pub const COMPRESSION_PACKBITS: u16 = 32773;
pub const COMPRESSION_DEFLATE_LEGACY: u16 = 32946;

/// Compression methods that can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u16)]
pub enum CompressionMethod {
  Uncompressed = 1,
  Lzw = 5,
  Deflate = 8,
}

impl CompressionMethod {
  /// Map a raw compression tag to a writable method
  pub fn from_tag(tag: u16) -> Result<Self> {
    Self::try_from(tag).map_err(|_| RetiffError::UnsupportedMethod(tag))
  }

  pub fn tag(&self) -> u16 {
    (*self).into()
  }

  pub fn name(&self) -> &'static str {
    compression_name(self.tag())
  }

  /// Predictors only apply to the dictionary and deflate codecs
  pub fn supports_predictor(&self) -> bool {
    !matches!(self, Self::Uncompressed)
  }

  pub fn compress(&self, data: &[u8], deflate_block_size: usize) -> Result<Vec<u8>> {
    match self {
      Self::Uncompressed => Ok(data.to_vec()),
      Self::Lzw => lzw::compress(data),
      Self::Deflate => deflate::compress(data, deflate_block_size),
    }
  }
}

impl Display for CompressionMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// Human readable name of a compression tag value
pub fn compression_name(tag: u16) -> &'static str {
  match tag {
    COMPRESSION_NONE => "uncompressed",
    COMPRESSION_LZW => "LZW",
    COMPRESSION_OJPEG => "JPEG (old-style)",
    COMPRESSION_JPEG => "JPEG",
    COMPRESSION_DEFLATE => "deflate (zip)",
    COMPRESSION_JPEG_DNG => "JPEG",
    COMPRESSION_PACKBITS => "PackBits",
    COMPRESSION_DEFLATE_LEGACY => "deflate (legacy)",
    _ => "unknown",
  }
}

/// Check if chunks stored with this compression tag can be decoded
pub fn can_decompress(tag: u16) -> bool {
  matches!(
    tag,
    COMPRESSION_NONE | COMPRESSION_LZW | COMPRESSION_DEFLATE | COMPRESSION_DEFLATE_LEGACY | COMPRESSION_PACKBITS
  )
}

/// Check if chunks stored with this compression tag may carry a predictor
pub fn has_predictor(tag: u16) -> bool {
  matches!(tag, COMPRESSION_LZW | COMPRESSION_DEFLATE | COMPRESSION_DEFLATE_LEGACY)
}

/// Largest expansion assumed when presizing a decode buffer
const MAX_PRESIZE_RATIO: usize = 1024;

/// Initial capacity of a buffer decoding `compressed` bytes
///
/// `expected` is derived from header fields and may be arbitrarily large,
/// so it is bounded by the compressed size.
pub(crate) fn decode_capacity(expected: usize, compressed: usize) -> usize {
  expected.min(compressed.saturating_mul(MAX_PRESIZE_RATIO))
}

/// Decode a single strip or tile
///
/// `expected` is the size of the chunk after decoding, computed from the
/// chunk geometry. It bounds PackBits runs and presizes buffers.
pub fn decompress(tag: u16, data: &[u8], expected: usize) -> Result<Vec<u8>> {
  match tag {
    COMPRESSION_NONE => Ok(data.to_vec()),
    COMPRESSION_LZW => lzw::decompress(data, expected),
    COMPRESSION_DEFLATE | COMPRESSION_DEFLATE_LEGACY => deflate::decompress(data, expected),
    COMPRESSION_PACKBITS => packbits::decompress(data, expected),
    COMPRESSION_CCITT_RLE | COMPRESSION_CCITT_FAX3 | COMPRESSION_CCITT_FAX4 => {
      Err(RetiffError::Codec(format!("CCITT compression ({}) can't be decoded", tag)))
    }
    _ => Err(RetiffError::Codec(format!(
      "Compression {} == {} can't be decoded",
      tag,
      compression_name(tag)
    ))),
  }
}
