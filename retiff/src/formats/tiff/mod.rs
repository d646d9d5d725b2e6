// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use thiserror::Error;

pub mod entry;
pub mod file;
pub mod ifd;
pub mod reader;
pub mod value;
pub mod writer;

pub use entry::Entry;
pub use file::TiffFile;
pub use ifd::IFD;
pub use reader::{GenericTiffReader, TiffReader};
pub use value::{Rational, SRational, TiffAscii, Value};
pub use writer::{DirectoryWriter, TiffWriter, WriteAndSeek};

pub const TIFF_MAGIC: u16 = 42;
pub const BIGTIFF_MAGIC: u16 = 43;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanarConfiguration {
  Chunky = 1,
  Planar = 2,
}

impl From<PlanarConfiguration> for Value {
  fn from(value: PlanarConfiguration) -> Self {
    Value::Short(vec![value as u16])
  }
}

/// Error variants for the TIFF container layer
#[derive(Debug, Error)]
pub enum TiffError {
  /// Overflow of input, size constraints...
  #[error("Overflow error: {}", _0)]
  Overflow(String),

  #[error("General error: {}", _0)]
  General(String),

  #[error("Format mismatch: {}", _0)]
  FormatMismatch(String),

  /// Error on internal cursor type
  #[error("I/O error: {:?}", _0)]
  Io(#[from] std::io::Error),
}

/// Result type for TIFF container operations
pub type Result<T> = std::result::Result<T, TiffError>;
