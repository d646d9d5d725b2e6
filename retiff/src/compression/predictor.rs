// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! TIFF predictors (tag 317)
//!
//! Chunks are processed row by row, samples are stored in the byte
//! order of the container. A trailing partial row is left untouched.

use crate::{Result, RetiffError, bits::Endian};

pub const PREDICTOR_NONE: u16 = 1;
pub const PREDICTOR_HORIZONTAL: u16 = 2;
pub const PREDICTOR_FLOATING_POINT: u16 = 3;

/// Row layout of a single strip or tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
  /// Pixels per row
  pub width: usize,
  /// Samples per pixel stored in this chunk
  pub samples: usize,
  pub bits_per_sample: u16,
}

impl RowLayout {
  /// Bytes per row, fails if the geometry overflows `usize`
  pub fn row_bytes(&self) -> Result<usize> {
    self
      .width
      .checked_mul(self.samples)
      .and_then(|n| n.checked_mul(self.bits_per_sample as usize))
      .map(|bits| bits.div_ceil(8))
      .ok_or_else(|| {
        RetiffError::Codec(format!(
          "Row of {} pixels with {} samples of {} bits is too large",
          self.width, self.samples, self.bits_per_sample
        ))
      })
  }

  fn sample_bytes(&self) -> usize {
    self.bits_per_sample as usize / 8
  }
}

/// Undo the predictor after decompression
pub fn reverse(predictor: u16, data: &mut [u8], layout: RowLayout, endian: Endian) -> Result<()> {
  match predictor {
    PREDICTOR_NONE => Ok(()),
    PREDICTOR_HORIZONTAL => {
      check_horizontal(layout)?;
      for row in rows(data, layout)? {
        horizontal_accumulate(row, layout, endian);
      }
      Ok(())
    }
    PREDICTOR_FLOATING_POINT => {
      check_floating_point(layout)?;
      for row in rows(data, layout)? {
        float_accumulate(row, layout, endian);
      }
      Ok(())
    }
    _ => Err(RetiffError::Codec(format!("Unknown predictor: {}", predictor))),
  }
}

/// Apply the predictor before compression
pub fn apply(predictor: u16, data: &mut [u8], layout: RowLayout, endian: Endian) -> Result<()> {
  match predictor {
    PREDICTOR_NONE => Ok(()),
    PREDICTOR_HORIZONTAL => {
      check_horizontal(layout)?;
      for row in rows(data, layout)? {
        horizontal_difference(row, layout, endian);
      }
      Ok(())
    }
    PREDICTOR_FLOATING_POINT => {
      check_floating_point(layout)?;
      for row in rows(data, layout)? {
        float_difference(row, layout, endian);
      }
      Ok(())
    }
    _ => Err(RetiffError::Codec(format!("Unknown predictor: {}", predictor))),
  }
}

fn rows(data: &mut [u8], layout: RowLayout) -> Result<std::slice::ChunksExactMut<'_, u8>> {
  // A zero row size yields no rows instead of panicking
  Ok(data.chunks_exact_mut(layout.row_bytes()?.max(1)))
}

fn check_horizontal(layout: RowLayout) -> Result<()> {
  match layout.bits_per_sample {
    8 | 16 | 32 | 64 => Ok(()),
    bps => Err(RetiffError::Codec(format!("Horizontal predictor with {} bits per sample is not supported", bps))),
  }
}

fn check_floating_point(layout: RowLayout) -> Result<()> {
  match layout.bits_per_sample {
    16 | 24 | 32 | 64 => Ok(()),
    bps => Err(RetiffError::Codec(format!(
      "Floating point predictor with {} bits per sample is not supported",
      bps
    ))),
  }
}

fn read_sample(endian: Endian, row: &[u8], idx: usize, bytes: usize) -> u64 {
  let offset = idx * bytes;
  match bytes {
    1 => row[offset] as u64,
    2 => endian.read_u16(row, offset) as u64,
    4 => endian.read_u32(row, offset) as u64,
    _ => endian.read_u64(row, offset),
  }
}

fn write_sample(endian: Endian, row: &mut [u8], idx: usize, bytes: usize, v: u64) {
  let offset = idx * bytes;
  match bytes {
    1 => row[offset] = v as u8,
    2 => endian.write_u16(&mut row[offset..], v as u16),
    4 => endian.write_u32(&mut row[offset..], v as u32),
    _ => endian.write_u64(&mut row[offset..], v),
  }
}

fn horizontal_accumulate(row: &mut [u8], layout: RowLayout, endian: Endian) {
  let bytes = layout.sample_bytes();
  let mask = sample_mask(bytes);
  let stride = layout.samples;
  for i in stride..layout.width * layout.samples {
    let prev = read_sample(endian, row, i - stride, bytes);
    let cur = read_sample(endian, row, i, bytes);
    write_sample(endian, row, i, bytes, cur.wrapping_add(prev) & mask);
  }
}

fn horizontal_difference(row: &mut [u8], layout: RowLayout, endian: Endian) {
  let bytes = layout.sample_bytes();
  let mask = sample_mask(bytes);
  let stride = layout.samples;
  for i in (stride..layout.width * layout.samples).rev() {
    let prev = read_sample(endian, row, i - stride, bytes);
    let cur = read_sample(endian, row, i, bytes);
    write_sample(endian, row, i, bytes, cur.wrapping_sub(prev) & mask);
  }
}

fn sample_mask(bytes: usize) -> u64 {
  if bytes >= 8 { u64::MAX } else { (1_u64 << (bytes * 8)) - 1 }
}

// Floating point rows hold byte planes, most significant byte first,
// which are differenced bytewise with a stride of one pixel.
fn float_accumulate(row: &mut [u8], layout: RowLayout, endian: Endian) {
  let stride = layout.samples;
  for i in stride..row.len() {
    row[i] = row[i].wrapping_add(row[i - stride]);
  }
  let bytes = layout.sample_bytes();
  let count = layout.width * layout.samples;
  let planes = row.to_vec();
  for sample in 0..count {
    for byte in 0..bytes {
      row[sample * bytes + stored_byte(endian, byte, bytes)] = planes[byte * count + sample];
    }
  }
}

fn float_difference(row: &mut [u8], layout: RowLayout, endian: Endian) {
  let bytes = layout.sample_bytes();
  let count = layout.width * layout.samples;
  let mut planes = vec![0; row.len()];
  for sample in 0..count {
    for byte in 0..bytes {
      planes[byte * count + sample] = row[sample * bytes + stored_byte(endian, byte, bytes)];
    }
  }
  row.copy_from_slice(&planes);
  let stride = layout.samples;
  for i in (stride..row.len()).rev() {
    row[i] = row[i].wrapping_sub(row[i - stride]);
  }
}

/// Position of the `byte`-th most significant byte inside a stored sample
fn stored_byte(endian: Endian, byte: usize, bytes: usize) -> usize {
  match endian {
    Endian::Big => byte,
    Endian::Little => bytes - 1 - byte,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn horizontal_8bit_differences() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let layout = RowLayout {
      width: 3,
      samples: 1,
      bits_per_sample: 8,
    };
    let mut data = vec![10, 12, 15, 200, 100, 50];
    apply(PREDICTOR_HORIZONTAL, &mut data, layout, Endian::Little)?;
    assert_eq!(data, vec![10, 2, 3, 200, 156, 206]);
    reverse(PREDICTOR_HORIZONTAL, &mut data, layout, Endian::Little)?;
    assert_eq!(data, vec![10, 12, 15, 200, 100, 50]);
    Ok(())
  }

  #[test]
  fn horizontal_16bit_respects_byte_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let layout = RowLayout {
      width: 2,
      samples: 1,
      bits_per_sample: 16,
    };
    let mut data = vec![0x01, 0x00, 0x03, 0x01];
    apply(PREDICTOR_HORIZONTAL, &mut data, layout, Endian::Big)?;
    // 0x0301 - 0x0100 = 0x0201
    assert_eq!(data, vec![0x01, 0x00, 0x02, 0x01]);
    let mut data = vec![0x01, 0x00, 0x03, 0x01];
    apply(PREDICTOR_HORIZONTAL, &mut data, layout, Endian::Little)?;
    // 0x0103 - 0x0001 = 0x0102
    assert_eq!(data, vec![0x01, 0x00, 0x02, 0x01]);
    Ok(())
  }

  #[test]
  fn predictors_are_reversible() -> std::result::Result<(), Box<dyn std::error::Error>> {
    for (predictor, bps) in [(2, 8), (2, 16), (2, 32), (2, 64), (3, 16), (3, 24), (3, 32), (3, 64)] {
      for endian in [Endian::Little, Endian::Big] {
        let layout = RowLayout {
          width: 5,
          samples: 3,
          bits_per_sample: bps,
        };
        // Two full rows and a partial one
        let len = layout.row_bytes()? * 2 + 3;
        let original: Vec<u8> = (0..len).map(|i| (i * 37 % 251) as u8).collect();
        let mut data = original.clone();
        apply(predictor, &mut data, layout, endian)?;
        assert_ne!(data, original);
        assert_eq!(&data[len - 3..], &original[len - 3..]);
        reverse(predictor, &mut data, layout, endian)?;
        assert_eq!(data, original, "predictor {} bps {} {:?}", predictor, bps, endian);
      }
    }
    Ok(())
  }

  #[test]
  fn float_predictor_splits_byte_planes() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let layout = RowLayout {
      width: 2,
      samples: 1,
      bits_per_sample: 16,
    };
    let mut data = vec![0xAA, 0x01, 0xBB, 0x02];
    apply(PREDICTOR_FLOATING_POINT, &mut data, layout, Endian::Big)?;
    // Planes [AA BB][01 02], then bytewise differences
    assert_eq!(data, vec![0xAA, 0x11, 0x46, 0x01]);
    Ok(())
  }

  #[test]
  fn unsupported_sample_sizes() {
    let layout = RowLayout {
      width: 8,
      samples: 1,
      bits_per_sample: 12,
    };
    let mut data = vec![0; 12];
    assert!(reverse(PREDICTOR_HORIZONTAL, &mut data, layout, Endian::Little).is_err());
    assert!(reverse(PREDICTOR_FLOATING_POINT, &mut data, layout, Endian::Little).is_err());
    assert!(reverse(PREDICTOR_NONE, &mut data, layout, Endian::Little).is_ok());
    assert!(reverse(7, &mut data, layout, Endian::Little).is_err());
  }
}
