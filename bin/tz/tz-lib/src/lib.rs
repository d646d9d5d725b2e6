// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::PathBuf;

use retiff::RetiffError;
use thiserror::Error;

pub mod app;
pub mod filemap;
pub mod recompress;
pub mod report;

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum AppError {
  #[error("{}", _0)]
  Usage(String),
  #[error("Not found: {}", _0.display())]
  NotFound(PathBuf),
  #[error("Input is a directory, not a file: {}", _0.display())]
  IsDirectory(PathBuf),
  #[error("Input file is read-only: {}", _0.display())]
  ReadOnly(PathBuf),
  #[error(transparent)]
  Retiff(#[from] RetiffError),
  #[error("I/O error: {}", _0)]
  Io(#[from] std::io::Error),
  #[error("Verification of transcoded file failed: {}", _0)]
  Verification(String),
}

impl AppError {
  /// Errors caused by the command line itself, the usage text is shown
  pub fn is_usage(&self) -> bool {
    matches!(self, Self::Usage(_))
  }
}

pub type Result<T> = std::result::Result<T, AppError>;
