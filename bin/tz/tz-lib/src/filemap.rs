// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  ffi::OsString,
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use crate::{AppError, Result};

/// Inserted between stem and extension of the temporary output
pub const TEMP_SUFFIX: &str = "-temp";

/// Input file and the temporary file its transcoded copy is written to
#[derive(Debug, Clone)]
pub struct FileMap {
  /// Absolute path of the input
  pub src: PathBuf,
  /// Temporary output next to the input
  pub temp: PathBuf,
}

impl FileMap {
  /// Check the input and derive the temporary output path
  ///
  /// The read-only check is skipped unless `writable` is set.
  pub fn new(input: &Path, writable: bool) -> Result<Self> {
    check_input(input, writable)?;
    let src = input.canonicalize()?;
    let temp = temp_path(&src)?;
    Ok(Self { src, temp })
  }
}

fn check_input(input: &Path, writable: bool) -> Result<()> {
  let md = match fs::metadata(input) {
    Ok(md) => md,
    Err(err) if err.kind() == ErrorKind::NotFound => return Err(AppError::NotFound(input.to_owned())),
    Err(err) => return Err(err.into()),
  };
  if md.is_dir() {
    return Err(AppError::IsDirectory(input.to_owned()));
  }
  if writable && md.permissions().readonly() {
    return Err(AppError::ReadOnly(input.to_owned()));
  }
  Ok(())
}

/// Map `scan.tif` to `scan-temp.tif` in the same directory
pub fn temp_path(input: &Path) -> Result<PathBuf> {
  let (stem, ext) = match (input.file_stem(), input.extension()) {
    (Some(stem), Some(ext)) => (stem, ext),
    _ => {
      return Err(AppError::Usage("can't find the file extension in the input filename".to_string()));
    }
  };
  let mut name = OsString::from(stem);
  name.push(TEMP_SUFFIX);
  name.push(".");
  name.push(ext);
  Ok(input.with_file_name(name))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn temp_name_keeps_extension() -> std::result::Result<(), Box<dyn std::error::Error>> {
    assert_eq!(temp_path(Path::new("/scans/page.tif"))?, PathBuf::from("/scans/page-temp.tif"));
    assert_eq!(temp_path(Path::new("a.b.TIFF"))?, PathBuf::from("a.b-temp.TIFF"));
    Ok(())
  }

  #[test]
  fn extension_comes_from_file_name() {
    assert!(matches!(temp_path(Path::new("/scans.d/page")), Err(AppError::Usage(_))));
    assert!(matches!(temp_path(Path::new(".profile")), Err(AppError::Usage(_))));
  }

  #[test]
  fn input_checks() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.tif");
    assert!(matches!(FileMap::new(&missing, true), Err(AppError::NotFound(_))));
    assert!(matches!(FileMap::new(dir.path(), false), Err(AppError::IsDirectory(_))));

    let file = dir.path().join("page.tif");
    fs::write(&file, b"II*\0")?;
    let map = FileMap::new(&file, true)?;
    assert!(map.src.is_absolute());
    assert_eq!(map.temp.file_name(), Some(std::ffi::OsStr::new("page-temp.tif")));

    let mut perms = fs::metadata(&file)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(&file, perms)?;
    assert!(matches!(FileMap::new(&file, true), Err(AppError::ReadOnly(_))));
    assert!(FileMap::new(&file, false).is_ok());
    Ok(())
  }
}
