// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::{Path, PathBuf};

use crate::{
  Result, RetiffError,
  bits::Endian,
  compression::COMPRESSION_NONE,
  formats::{
    sniff::ContainerFormat,
    tiff::{GenericTiffReader, IFD, TiffError, TiffFile, Value},
  },
  tags::{TiffCommonTag, TiffTag},
};

use super::{
  metadata::{MetadataBlockReader, MetadataBlocks},
  pixels::PixelSource,
};

/// Read-only decoder for an image container
///
/// The whole file is loaded on creation, frames are decoded on request.
#[derive(Debug)]
pub struct ContainerDecoder {
  path: PathBuf,
  format: ContainerFormat,
  data: Vec<u8>,
  tiff: Option<TiffFile>,
}

impl ContainerDecoder {
  pub(crate) fn open(path: &Path) -> Result<Self> {
    let data = std::fs::read(path).map_err(|err| RetiffError::with_io_error(path, err))?;
    let format = ContainerFormat::detect(&data).ok_or_else(|| {
      RetiffError::with_io_error(
        path,
        std::io::Error::new(std::io::ErrorKind::InvalidData, "not a recognized image container"),
      )
    })?;
    log::debug!("Detected {} container for {}", format, path.display());

    let tiff = match format {
      ContainerFormat::Tiff => {
        let reader = GenericTiffReader::new_with_buffer(&data, 0, None).map_err(|err| match err {
          TiffError::Io(err) => RetiffError::with_io_error(path, err),
          err => RetiffError::with_io_error(path, std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())),
        })?;
        Some(reader.into_file())
      }
      _ => None,
    };

    Ok(Self {
      path: path.to_path_buf(),
      format,
      data,
      tiff,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn container_format(&self) -> ContainerFormat {
    self.format
  }

  /// Byte order of the container, if it declares one
  pub fn byte_order(&self) -> Option<Endian> {
    self.tiff.as_ref().map(|tiff| tiff.endian)
  }

  /// Size of the container in bytes
  pub fn size(&self) -> usize {
    self.data.len()
  }

  pub fn frame_count(&self) -> Result<usize> {
    Ok(self.tiff_file()?.chain.len())
  }

  pub fn frame(&self, index: usize) -> Result<FrameDecode<'_>> {
    let tiff = self.tiff_file()?;
    let ifd = tiff.chain.get(index).ok_or_else(|| {
      RetiffError::Codec(format!(
        "Frame index {} out of range, {} has {} frames",
        index,
        self.path.display(),
        tiff.chain.len()
      ))
    })?;
    Ok(FrameDecode {
      index,
      ifd,
      data: &self.data,
      endian: tiff.endian,
      blocks: MetadataBlocks::from_tiff_ifd(ifd),
    })
  }

  fn tiff_file(&self) -> Result<&TiffFile> {
    self
      .tiff
      .as_ref()
      .ok_or_else(|| RetiffError::Codec(format!("No frame decoder for {} containers", self.format)))
  }
}

/// A single decoded frame of a container
pub struct FrameDecode<'a> {
  index: usize,
  ifd: &'a IFD,
  data: &'a [u8],
  endian: Endian,
  blocks: MetadataBlocks,
}

impl<'a> FrameDecode<'a> {
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn metadata_query_reader(&self) -> MetadataQueryReader<'a> {
    MetadataQueryReader { ifd: self.ifd }
  }

  pub fn block_reader(&self) -> Option<&dyn MetadataBlockReader> {
    Some(&self.blocks)
  }

  /// Raw value of the compression tag
  pub fn compression(&self) -> Option<u16> {
    self.metadata_query_reader().get_u16(TiffCommonTag::Compression)
  }

  pub fn dimensions(&self) -> Option<(u32, u32)> {
    let query = self.metadata_query_reader();
    Some((query.get_u32(TiffCommonTag::ImageWidth)?, query.get_u32(TiffCommonTag::ImageLength)?))
  }

  /// Decompress the pixel data of this frame
  pub fn pixel_source(&self) -> Result<PixelSource> {
    let compression = self.compression().unwrap_or(COMPRESSION_NONE);
    if !crate::compression::can_decompress(compression) {
      return Err(RetiffError::Codec(format!(
        "Frame {} uses compression {} == {}, which can't be decoded",
        self.index,
        compression,
        crate::compression::compression_name(compression)
      )));
    }
    PixelSource::from_tiff_ifd(self.ifd, self.data, self.endian)
  }
}

/// Structured read access to the tags of a frame
#[derive(Debug, Clone, Copy)]
pub struct MetadataQueryReader<'a> {
  ifd: &'a IFD,
}

impl<'a> MetadataQueryReader<'a> {
  pub fn get_value<T: TiffTag>(&self, tag: T) -> Option<&'a Value> {
    self.ifd.get_entry(tag).map(|entry| &entry.value)
  }

  /// First value of an integer tag, `None` if missing or not an integer
  pub fn get_u16<T: TiffTag>(&self, tag: T) -> Option<u16> {
    self.get_value(tag).and_then(|value| value.get_u16(0).ok().flatten())
  }

  pub fn get_u32<T: TiffTag>(&self, tag: T) -> Option<u32> {
    self.get_value(tag).and_then(|value| value.get_u32(0).ok().flatten())
  }

  pub fn get_string<T: TiffTag>(&self, tag: T) -> Option<&'a String> {
    self.get_value(tag).and_then(Value::as_string)
  }

  pub fn contains<T: TiffTag>(&self, tag: T) -> bool {
    self.ifd.has_entry(tag)
  }
}
