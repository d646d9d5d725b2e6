// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Byte order of a TIFF container
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
  Big,
  #[default]
  Little,
}

impl Endian {
  /// The two-byte marker opening a TIFF header
  pub fn tiff_marker(&self) -> [u8; 2] {
    match *self {
      Self::Big => [0x4d, 0x4d],
      Self::Little => [0x49, 0x49],
    }
  }

  #[inline]
  pub fn read_u16(&self, buf: &[u8], offset: usize) -> u16 {
    match *self {
      Self::Big => BigEndian::read_u16(&buf[offset..]),
      Self::Little => LittleEndian::read_u16(&buf[offset..]),
    }
  }

  #[inline]
  pub fn read_u32(&self, buf: &[u8], offset: usize) -> u32 {
    match *self {
      Self::Big => BigEndian::read_u32(&buf[offset..]),
      Self::Little => LittleEndian::read_u32(&buf[offset..]),
    }
  }

  #[inline]
  pub fn read_u64(&self, buf: &[u8], offset: usize) -> u64 {
    match *self {
      Self::Big => BigEndian::read_u64(&buf[offset..]),
      Self::Little => LittleEndian::read_u64(&buf[offset..]),
    }
  }

  #[inline]
  pub fn write_u16(&self, buf: &mut [u8], n: u16) {
    match *self {
      Self::Big => BigEndian::write_u16(buf, n),
      Self::Little => LittleEndian::write_u16(buf, n),
    }
  }

  #[inline]
  pub fn write_u32(&self, buf: &mut [u8], n: u32) {
    match *self {
      Self::Big => BigEndian::write_u32(buf, n),
      Self::Little => LittleEndian::write_u32(buf, n),
    }
  }

  #[inline]
  pub fn write_u64(&self, buf: &mut [u8], n: u64) {
    match *self {
      Self::Big => BigEndian::write_u64(buf, n),
      Self::Little => LittleEndian::write_u64(buf, n),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn endian_roundtrip_u16() {
    let mut buf = [0_u8; 2];
    Endian::Big.write_u16(&mut buf, 0x1234);
    assert_eq!(buf, [0x12, 0x34]);
    assert_eq!(Endian::Big.read_u16(&buf, 0), 0x1234);
    assert_eq!(Endian::Little.read_u16(&buf, 0), 0x3412);
  }

  #[test]
  fn tiff_markers() {
    assert_eq!(&Endian::Little.tiff_marker(), b"II");
    assert_eq!(&Endian::Big.tiff_marker(), b"MM");
  }
}
