// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::warn;

/// Verify a transcoded file before it replaces the original.
/// Enabled unless `RETIFF_VERIFY_OUTPUT` is `0`.
pub fn retiff_verify_output() -> bool {
  match std::env::var("RETIFF_VERIFY_OUTPUT").map(|val| val.parse::<u32>()) {
    Ok(Ok(value)) => value != 0,
    Ok(Err(_)) => {
      warn!("Invalid value for RETIFF_VERIFY_OUTPUT");
      true
    }
    Err(_) => true,
  }
}

pub(crate) fn retiff_deflate_block_size() -> Option<usize> {
  match std::env::var("RETIFF_DEFLATE_BLOCK_SIZE").map(|val| val.parse::<usize>()) {
    Ok(Ok(value)) if value > 0 => Some(value),
    Ok(_) => {
      warn!("Invalid value for RETIFF_DEFLATE_BLOCK_SIZE");
      None
    }
    Err(_) => None,
  }
}
