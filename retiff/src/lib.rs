//! Library to inspect and losslessly re-compress TIFF containers.
//! Every frame of a TIFF file is decoded, re-encoded with a new
//! storage compression (uncompressed, LZW or Deflate) together with its
//! metadata blocks, and the original file is replaced only after the
//! new container was fully written.
//!
//! # Example
//! ```rust,no_run
//! use retiff::{CompressionMethod, ImagingFactory};
//!
//! fn main() -> retiff::Result<()> {
//!   let factory = ImagingFactory::new();
//!   let current = retiff::inspect(&factory, "scan.tif")?;
//!   if current != u16::from(CompressionMethod::Deflate) {
//!     retiff::remove_stale("scan-temp.tif")?;
//!     retiff::transcode(&factory, "scan.tif", "scan-temp.tif", CompressionMethod::Deflate.into())?;
//!     retiff::replace("scan.tif", "scan-temp.tif")?;
//!   }
//!   Ok(())
//! }
//! ```

#![deny(
    //missing_docs,
    //missing_debug_implementations,
    //missing_copy_implementations,
    //unsafe_code,
    unstable_features,
    //unused_import_braces,
    //unused_qualifications
  )]

use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod bits;
pub mod compression;
pub mod envparams;
pub mod formats;
pub mod imaging;
pub mod inspect;
pub mod replace;
pub mod tags;
pub mod transcode;

pub use compression::CompressionMethod;
pub use formats::sniff::ContainerFormat;
pub use formats::tiff::TiffError;
pub use imaging::{ImagingFactory, ImagingParams};
pub use inspect::{ContainerInfo, inspect, inspect_container};
pub use replace::{ReplaceStep, remove_stale, replace, safety_path};
pub use transcode::transcode;

#[derive(Error, Debug)]
pub enum RetiffError {
  #[error("File is not a TIFF container: {}", _0.display())]
  NotTiff(PathBuf),

  #[error("Required metadata is missing: {}", _0)]
  MetadataMissing(String),

  #[error("Compression method {} is not supported for writing", _0)]
  UnsupportedMethod(u16),

  #[error("I/O error on file {}: {}", path.display(), source)]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Codec error: {}", _0)]
  Codec(String),

  #[error("Rename failed in step '{}' ({} -> {}): {}", step, from.display(), to.display(), source)]
  Rename {
    step: ReplaceStep,
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T> = std::result::Result<T, RetiffError>;

impl RetiffError {
  pub fn with_io_error(path: impl AsRef<Path>, error: std::io::Error) -> Self {
    Self::Io {
      path: path.as_ref().to_path_buf(),
      source: error,
    }
  }
}

impl From<TiffError> for RetiffError {
  fn from(err: TiffError) -> Self {
    Self::Codec(err.to_string())
  }
}
