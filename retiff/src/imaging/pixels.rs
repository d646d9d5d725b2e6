// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::collections::BTreeMap;

use crate::{
  Result, RetiffError,
  bits::Endian,
  compression::{
    self, COMPRESSION_NONE,
    predictor::{self, PREDICTOR_NONE, RowLayout},
  },
  formats::tiff::{Entry, IFD, PlanarConfiguration},
  tags::TiffCommonTag,
};

use super::metadata::PIXEL_FORMAT_TAGS;

/// Storage layout of the pixel chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
  Strips { rows_per_strip: u32 },
  Tiles { width: u32, length: u32 },
}

/// Decoded pixel data of a single frame
///
/// Chunks are stored decompressed and with any predictor reversed, in the
/// byte order of the source container. The chunk geometry is kept so a
/// re-encoded frame only differs in the compression of each chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSource {
  pub width: u32,
  pub length: u32,
  pub bits_per_sample: u16,
  pub samples_per_pixel: u16,
  pub planar: PlanarConfiguration,
  pub layout: ChunkLayout,
  /// Predictor used by the source frame, `1` if none
  pub predictor: u16,
  pub endian: Endian,
  /// Pixel format entries as found in the source frame
  pub format: BTreeMap<u16, Entry>,
  pub chunks: Vec<Vec<u8>>,
}

impl PixelSource {
  /// Decode all strips or tiles of a TIFF frame
  ///
  /// `data` is the full container, offsets in `ifd` are relative to it.
  pub fn from_tiff_ifd(ifd: &IFD, data: &[u8], endian: Endian) -> Result<Self> {
    let width = ifd.require_u32(TiffCommonTag::ImageWidth)?;
    let length = ifd.require_u32(TiffCommonTag::ImageLength)?;
    let bits_per_sample = get_u16_or(ifd, TiffCommonTag::BitsPerSample, 1)?;
    let samples_per_pixel = get_u16_or(ifd, TiffCommonTag::SamplesPerPixel, 1)?;
    let planar = match get_u16_or(ifd, TiffCommonTag::PlanarConfiguration, 1)? {
      2 => PlanarConfiguration::Planar,
      _ => PlanarConfiguration::Chunky,
    };
    let compression = get_u16_or(ifd, TiffCommonTag::Compression, COMPRESSION_NONE)?;
    let predictor = if compression::has_predictor(compression) {
      get_u16_or(ifd, TiffCommonTag::Predictor, PREDICTOR_NONE)?
    } else {
      PREDICTOR_NONE
    };

    let (layout, offsets_tag, counts_tag) = if ifd.has_entry(TiffCommonTag::TileOffsets) {
      let layout = ChunkLayout::Tiles {
        width: ifd.require_u32(TiffCommonTag::TileWidth)?,
        length: ifd.require_u32(TiffCommonTag::TileLength)?,
      };
      (layout, TiffCommonTag::TileOffsets, TiffCommonTag::TileByteCounts)
    } else {
      let rows_per_strip = ifd
        .get_entry(TiffCommonTag::RowsPerStrip)
        .map(|entry| entry.get_u32(0))
        .transpose()?
        .flatten()
        .unwrap_or(u32::MAX);
      let layout = ChunkLayout::Strips { rows_per_strip };
      (layout, TiffCommonTag::StripOffsets, TiffCommonTag::StripByteCounts)
    };
    let offsets = get_u32_vec(ifd, offsets_tag)?;
    let counts = get_u32_vec(ifd, counts_tag)?;
    if offsets.len() != counts.len() {
      return Err(RetiffError::Codec(format!(
        "Frame has {} chunk offsets but {} byte counts",
        offsets.len(),
        counts.len()
      )));
    }

    let format = ifd
      .entries()
      .values()
      .filter(|entry| PIXEL_FORMAT_TAGS.contains(&entry.tag))
      .map(|entry| (entry.tag, Entry::new(entry.tag, entry.value.clone())))
      .collect();

    let mut source = Self {
      width,
      length,
      bits_per_sample,
      samples_per_pixel,
      planar,
      layout,
      predictor,
      endian,
      format,
      chunks: Vec::with_capacity(offsets.len()),
    };

    log::debug!(
      "Decoding {} chunks of {}x{} frame, compression {}, predictor {}",
      offsets.len(),
      width,
      length,
      compression,
      predictor
    );
    for (index, (offset, count)) in offsets.iter().zip(counts.iter()).enumerate() {
      let start = ifd.base as usize + *offset as usize;
      let raw = start.checked_add(*count as usize).and_then(|end| data.get(start..end)).ok_or_else(|| {
        RetiffError::Codec(format!(
          "Chunk {} at offset {} with {} bytes exceeds the container size of {} bytes",
          index,
          offset,
          count,
          data.len()
        ))
      })?;
      let (row_layout, rows) = source.chunk_geometry(index);
      let expected = row_layout
        .row_bytes()?
        .checked_mul(rows)
        .ok_or_else(|| RetiffError::Codec(format!("Chunk {} with {} rows of {}x{} pixels is too large", index, rows, width, length)))?;
      let mut chunk = compression::decompress(compression, raw, expected)?;
      if chunk.len() < expected {
        log::warn!("Chunk {} decoded to {} bytes, expected {}", index, chunk.len(), expected);
      }
      predictor::reverse(predictor, &mut chunk, row_layout, endian)?;
      source.chunks.push(chunk);
    }
    Ok(source)
  }

  /// Samples stored per pixel in a single chunk
  pub fn chunk_samples(&self) -> usize {
    match self.planar {
      PlanarConfiguration::Planar => 1,
      PlanarConfiguration::Chunky => self.samples_per_pixel as usize,
    }
  }

  /// Row layout and number of rows of the chunk at `index`
  pub fn chunk_geometry(&self, index: usize) -> (RowLayout, usize) {
    match self.layout {
      ChunkLayout::Tiles { width, length } => {
        let layout = RowLayout {
          width: width as usize,
          samples: self.chunk_samples(),
          bits_per_sample: self.bits_per_sample,
        };
        (layout, length as usize)
      }
      ChunkLayout::Strips { rows_per_strip } => {
        let layout = RowLayout {
          width: self.width as usize,
          samples: self.chunk_samples(),
          bits_per_sample: self.bits_per_sample,
        };
        let rows_per_strip = rows_per_strip.clamp(1, self.length.max(1)) as usize;
        let strips_per_plane = (self.length as usize).div_ceil(rows_per_strip).max(1);
        let first_row = (index % strips_per_plane) * rows_per_strip;
        let rows = rows_per_strip.min((self.length as usize).saturating_sub(first_row));
        (layout, rows)
      }
    }
  }

  /// Total number of decoded bytes
  pub fn byte_size(&self) -> usize {
    self.chunks.iter().map(Vec::len).sum()
  }
}

fn get_u16_or(ifd: &IFD, tag: TiffCommonTag, default: u16) -> Result<u16> {
  Ok(ifd.get_entry(tag).map(|entry| entry.get_u16(0)).transpose()?.flatten().unwrap_or(default))
}

fn get_u32_vec(ifd: &IFD, tag: TiffCommonTag) -> Result<Vec<u32>> {
  ifd
    .get_entry(tag)
    .ok_or_else(|| RetiffError::MetadataMissing(format!("Frame has no {:?} tag", tag)))?
    .as_u32_vec()
    .map_err(RetiffError::from)
}
