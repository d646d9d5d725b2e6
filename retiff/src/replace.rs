// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  ffi::OsString,
  fmt::Display,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Result, RetiffError};

/// Suffix appended to the original file name while it is replaced
pub const SAFETY_SUFFIX: &str = "-saved";

/// Steps of the rename sequence in [`replace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplaceStep {
  /// Rename the original to its safety name
  Backup,
  /// Rename the transcoded file to the original name
  Substitute,
  /// Delete the safety file
  Cleanup,
}

impl Display for ReplaceStep {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Backup => f.write_str("rename original to safety name"),
      Self::Substitute => f.write_str("rename new file to original name"),
      Self::Cleanup => f.write_str("delete saved original"),
    }
  }
}

/// Path the original is parked at during [`replace`]
pub fn safety_path<P: AsRef<Path>>(original: P) -> PathBuf {
  let mut name = OsString::from(original.as_ref().as_os_str());
  name.push(SAFETY_SUFFIX);
  PathBuf::from(name)
}

/// Swap `transcoded` in for `original`
///
/// The original is renamed to its safety name first, then the transcoded
/// file takes over the original name and the safety file is deleted.
/// A failure in the second step leaves the original only under the
/// safety name, a failure in the last step leaves a stale safety file.
/// Neither is rolled back, the error names the paths involved.
pub fn replace<P: AsRef<Path>, Q: AsRef<Path>>(original: P, transcoded: Q) -> Result<()> {
  let (original, transcoded) = (original.as_ref(), transcoded.as_ref());
  let safety = safety_path(original);

  if safety.symlink_metadata().is_ok() {
    return Err(RetiffError::Rename {
      step: ReplaceStep::Backup,
      from: original.to_path_buf(),
      to: safety,
      source: std::io::Error::new(ErrorKind::AlreadyExists, "safety file already exists"),
    });
  }
  rename(ReplaceStep::Backup, original, &safety)?;
  if let Err(err) = rename(ReplaceStep::Substitute, transcoded, original) {
    log::error!("Original file is only available as {}", safety.display());
    return Err(err);
  }
  std::fs::remove_file(&safety).map_err(|source| RetiffError::Rename {
    step: ReplaceStep::Cleanup,
    from: safety.clone(),
    to: safety.clone(),
    source,
  })?;
  log::debug!("Replaced {} with {}", original.display(), transcoded.display());
  Ok(())
}

fn rename(step: ReplaceStep, from: &Path, to: &Path) -> Result<()> {
  log::trace!("{}: {} -> {}", step, from.display(), to.display());
  std::fs::rename(from, to).map_err(|source| RetiffError::Rename {
    step,
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })
}

/// Delete a leftover temporary output, a missing file is fine
pub fn remove_stale<P: AsRef<Path>>(path: P) -> Result<()> {
  let path = path.as_ref();
  match std::fs::remove_file(path) {
    Ok(()) => {
      log::info!("Deleted stale temporary file {}", path.display());
      Ok(())
    }
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(err) => Err(RetiffError::with_io_error(path, err)),
  }
}
