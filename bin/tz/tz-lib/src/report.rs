// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Lines printed to stdout by the driver

use std::path::Path;

use retiff::{ReplaceStep, RetiffError, compression::compression_name};

/// Format `n` with `,` between groups of three digits
pub fn thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

pub fn input_file(arg: &Path) -> String {
  format!("input file: {}", arg.display())
}

pub fn current_compression(compression: u16, path: &Path) -> String {
  format!(
    "the current compression is {} == {} for file {}",
    compression,
    compression_name(compression),
    path.display()
  )
}

pub fn sizes(original: u64, new: u64) -> String {
  format!("original file size {} new size {}", thousands(original), thousands(new))
}

/// Explain why the current compression could not be determined
pub fn inspect_failure(err: &RetiffError) -> String {
  match err {
    RetiffError::NotTiff(_) => format!(
      "container format of the input file isn't TIFF, so exiting early\nfailed to read current compression value: {}",
      err
    ),
    err => format!("failed to read current compression value: {}", err),
  }
}

/// Explain which rename step failed and where the original is now
pub fn replace_failure(err: &RetiffError) -> String {
  match err {
    RetiffError::Rename { step, from, to, source } => match step {
      ReplaceStep::Backup => format!("can't rename the original file, error {}", source),
      ReplaceStep::Substitute => format!(
        "can't rename new file to the original file name, error {}\nthe original file is saved as {}",
        source,
        retiff::safety_path(to).display()
      ),
      ReplaceStep::Cleanup => format!("can't delete the saved original file {}, error {}", from.display(), source),
    },
    err => format!("can't replace the original file: {}", err),
  }
}
