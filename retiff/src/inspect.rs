// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
  ImagingFactory, Result, RetiffError,
  formats::sniff::ContainerFormat,
  imaging::{ContainerDecoder, FrameDecode},
  tags::TiffCommonTag,
};

/// Summary of a TIFF container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
  pub path: PathBuf,
  pub format: ContainerFormat,
  /// Compression tag of each frame, in frame order
  pub compressions: Vec<u16>,
}

impl ContainerInfo {
  pub fn frame_count(&self) -> usize {
    self.compressions.len()
  }

  /// Compression of the first frame
  pub fn compression(&self) -> Option<u16> {
    self.compressions.first().copied()
  }
}

/// Read the compression tag of the first frame of a TIFF file
///
/// The file is opened read-only and never modified.
pub fn inspect<P: AsRef<Path>>(factory: &ImagingFactory, path: P) -> Result<u16> {
  let path = path.as_ref();
  let decoder = open_tiff(factory, path)?;
  let count = decoder.frame_count()?;
  if count == 0 {
    return Err(RetiffError::MetadataMissing(format!("{} contains no frames", path.display())));
  }
  let compression = frame_compression(&decoder.frame(0)?, path)?;
  log::debug!("{} has {} frames, first frame compression {}", path.display(), count, compression);
  Ok(compression)
}

/// Read the compression tags of all frames of a TIFF file
pub fn inspect_container<P: AsRef<Path>>(factory: &ImagingFactory, path: P) -> Result<ContainerInfo> {
  let path = path.as_ref();
  let decoder = open_tiff(factory, path)?;
  let count = decoder.frame_count()?;
  if count == 0 {
    return Err(RetiffError::MetadataMissing(format!("{} contains no frames", path.display())));
  }
  let compressions = (0..count)
    .map(|index| frame_compression(&decoder.frame(index)?, path))
    .collect::<Result<Vec<u16>>>()?;
  Ok(ContainerInfo {
    path: path.to_path_buf(),
    format: decoder.container_format(),
    compressions,
  })
}

/// Open a decoder and make sure it is a classic TIFF container
pub(crate) fn open_tiff(factory: &ImagingFactory, path: &Path) -> Result<ContainerDecoder> {
  let decoder = factory.create_decoder_from_path(path)?;
  match decoder.container_format() {
    ContainerFormat::Tiff => Ok(decoder),
    ContainerFormat::BigTiff => Err(RetiffError::Codec(format!(
      "{} is a BigTIFF container, which is not supported",
      path.display()
    ))),
    format => {
      log::info!("Container format of {} is {}, not TIFF", path.display(), format);
      Err(RetiffError::NotTiff(path.to_path_buf()))
    }
  }
}

fn frame_compression(frame: &FrameDecode<'_>, path: &Path) -> Result<u16> {
  frame.metadata_query_reader().get_u16(TiffCommonTag::Compression).ok_or_else(|| {
    RetiffError::MetadataMissing(format!(
      "Frame {} of {} has no compression tag",
      frame.index(),
      path.display()
    ))
  })
}
