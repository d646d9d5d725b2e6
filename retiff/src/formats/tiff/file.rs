// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::IFD;
use crate::bits::Endian;
use serde::{Deserialize, Serialize};

/// Parsed structure of a TIFF file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TiffFile {
  /// Chain of all top-level IFDs in TIFF
  pub chain: Vec<IFD>,
  /// Base offset, starting from file or buffer (good for embedded TIFF in other structures)
  pub base: u32,
  /// Byte order declared by the header
  pub endian: Endian,
}

impl TiffFile {
  pub fn new(base: u32) -> Self {
    Self {
      base,
      chain: Vec::new(),
      endian: Endian::default(),
    }
  }
}
