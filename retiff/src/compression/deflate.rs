// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Write};

use libflate::zlib::{Decoder, EncodeOptions, Encoder};

use crate::{Result, RetiffError};

/// Default block size for the deflate encoder
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

/// Compress a chunk into a zlib stream, as used by TIFF compression 8
pub fn compress(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
  let mut encoder = Encoder::with_options(Vec::with_capacity(data.len() / 2), EncodeOptions::new().block_size(block_size))
    .map_err(|e| RetiffError::Codec(format!("Deflate encoder setup failed: {}", e)))?;
  encoder
    .write_all(data)
    .map_err(|e| RetiffError::Codec(format!("Deflate encoder failed: {}", e)))?;
  encoder
    .finish()
    .into_result()
    .map_err(|e| RetiffError::Codec(format!("Deflate encoder failed: {}", e)))
}

pub fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>> {
  let mut decoder = Decoder::new(data).map_err(|e| RetiffError::Codec(format!("Invalid zlib header: {}", e)))?;
  let mut out = Vec::with_capacity(super::decode_capacity(expected, data.len()));
  decoder
    .read_to_end(&mut out)
    .map_err(|e| RetiffError::Codec(format!("Deflate decoder failed: {}", e)))?;
  Ok(out)
}
