// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use crate::{Result, RetiffError};

/// Decode PackBits run-length data, stops after `expected` bytes
pub fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>> {
  let mut out = Vec::with_capacity(super::decode_capacity(expected, data.len()));
  let mut i = 0;
  while i < data.len() && out.len() < expected {
    let header = data[i] as i8;
    i += 1;
    match header {
      // no-op
      -128 => {}
      0.. => {
        let count = header as usize + 1;
        let literal = data
          .get(i..i + count)
          .ok_or_else(|| RetiffError::Codec("PackBits: literal run exceeds input".to_string()))?;
        out.extend_from_slice(literal);
        i += count;
      }
      _ => {
        let count = (-(header as isize)) as usize + 1;
        let value = *data
          .get(i)
          .ok_or_else(|| RetiffError::Codec("PackBits: repeat run exceeds input".to_string()))?;
        out.resize(out.len() + count, value);
        i += 1;
      }
    }
  }
  if out.len() > expected {
    out.truncate(expected);
  }
  Ok(out)
}
