// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use weezl::{BitOrder, decode::Decoder, encode::Encoder};

use crate::{Result, RetiffError};

// TIFF LZW: MSB-first codes, 8-bit alphabet, early code size switch
const LZW_CODE_SIZE: u8 = 8;

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
  let mut encoder = Encoder::with_tiff_size_switch(BitOrder::Msb, LZW_CODE_SIZE);
  encoder.encode(data).map_err(|err| RetiffError::Codec(format!("LZW encoder failed: {}", err)))
}

pub fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>> {
  let mut decoder = Decoder::with_tiff_size_switch(BitOrder::Msb, LZW_CODE_SIZE);
  let mut out = Vec::with_capacity(super::decode_capacity(expected, data.len()));
  let result = decoder.into_vec(&mut out).decode(data);
  match result.status {
    Ok(_) => Ok(out),
    // Some writers leave garbage after the last full row
    Err(err) if out.len() >= expected => {
      log::warn!("LZW stream is corrupt after {} decoded bytes, keeping full chunk: {}", out.len(), err);
      out.truncate(expected);
      Ok(out)
    }
    Err(err) => Err(RetiffError::Codec(format!("LZW decoder failed after {} of {} bytes: {}", out.len(), expected, err))),
  }
}
