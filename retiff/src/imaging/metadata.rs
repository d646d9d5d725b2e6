// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
  Result, RetiffError,
  formats::{
    sniff::ContainerFormat,
    tiff::{Entry, IFD, TiffWriter, Value, WriteAndSeek},
  },
  tags::{ExifTag, TiffCommonTag},
};

/// Tags describing the pixel layout, carried by `PixelSource`
pub const PIXEL_FORMAT_TAGS: [u16; 12] = [
  TiffCommonTag::ImageWidth as u16,
  TiffCommonTag::ImageLength as u16,
  TiffCommonTag::BitsPerSample as u16,
  TiffCommonTag::PhotometricInt as u16,
  TiffCommonTag::SamplesPerPixel as u16,
  TiffCommonTag::RowsPerStrip as u16,
  TiffCommonTag::PlanarConfiguration as u16,
  TiffCommonTag::ColorMap as u16,
  TiffCommonTag::TileWidth as u16,
  TiffCommonTag::TileLength as u16,
  TiffCommonTag::ExtraSamples as u16,
  TiffCommonTag::SampleFormat as u16,
];

/// Tags rebuilt by the encoder for the new chunk data
const STORAGE_TAGS: [u16; 12] = [
  TiffCommonTag::Compression as u16,
  TiffCommonTag::StripOffsets as u16,
  TiffCommonTag::StripByteCounts as u16,
  TiffCommonTag::FreeOffsets as u16,
  TiffCommonTag::FreeByteCounts as u16,
  TiffCommonTag::Predictor as u16,
  TiffCommonTag::TileOffsets as u16,
  TiffCommonTag::TileByteCounts as u16,
  TiffCommonTag::SubIFDs as u16,
  TiffCommonTag::JPEGTables as u16,
  TiffCommonTag::JPEGInterchangeFormat as u16,
  TiffCommonTag::JPEGInterchangeFormatLength as u16,
];

const POINTER_TAGS: [u16; 3] = [
  TiffCommonTag::ExifIFDPointer as u16,
  ExifTag::GPSInfo as u16,
  ExifTag::InteropIFDPointer as u16,
];

/// Check if a tag is written by the encoder and never copied as metadata
pub fn is_encoder_owned(tag: u16) -> bool {
  PIXEL_FORMAT_TAGS.contains(&tag) || STORAGE_TAGS.contains(&tag) || POINTER_TAGS.contains(&tag)
}

/// Kind of a metadata block, in the order blocks are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockKind {
  /// Descriptive tags of the frame IFD itself
  Ifd,
  Exif,
  Gps,
  Interop,
  Xmp,
  Iptc,
  Icc,
  Photoshop,
}

impl BlockKind {
  /// Tag holding the payload of single-entry blocks
  pub fn payload_tag(&self) -> Option<u16> {
    match self {
      Self::Xmp => Some(TiffCommonTag::Xmp.into()),
      Self::Iptc => Some(TiffCommonTag::Iptc.into()),
      Self::Icc => Some(TiffCommonTag::IccProfile.into()),
      Self::Photoshop => Some(TiffCommonTag::Photoshop.into()),
      Self::Ifd | Self::Exif | Self::Gps | Self::Interop => None,
    }
  }

  fn payload_kinds() -> [BlockKind; 4] {
    [Self::Xmp, Self::Iptc, Self::Icc, Self::Photoshop]
  }

  fn is_payload_tag(tag: u16) -> bool {
    Self::payload_kinds().iter().any(|kind| kind.payload_tag() == Some(tag))
  }
}

impl Display for BlockKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Ifd => "IFD",
      Self::Exif => "EXIF",
      Self::Gps => "GPS",
      Self::Interop => "Interop",
      Self::Xmp => "XMP",
      Self::Iptc => "IPTC",
      Self::Icc => "ICC",
      Self::Photoshop => "Photoshop",
    };
    f.write_str(name)
  }
}

/// Named chunk of auxiliary data attached to a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataBlock {
  pub kind: BlockKind,
  /// Entries ordered by tag. Payload blocks hold a single entry.
  pub entries: Vec<Entry>,
}

impl MetadataBlock {
  pub fn new(kind: BlockKind, entries: Vec<Entry>) -> Self {
    let mut entries = entries;
    entries.sort_by_key(|entry| entry.tag);
    Self { kind, entries }
  }

  fn from_ifd(kind: BlockKind, ifd: &IFD, skip: impl Fn(u16) -> bool) -> Self {
    // Offsets of the source file are meaningless for the new container
    let entries = ifd
      .entries()
      .values()
      .filter(|entry| !skip(entry.tag))
      .map(|entry| Entry::new(entry.tag, entry.value.clone()))
      .collect();
    Self { kind, entries }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Read access to the metadata blocks of a frame
pub trait MetadataBlockReader {
  fn container_format(&self) -> ContainerFormat;
  fn count(&self) -> usize;
  fn block(&self, index: usize) -> Option<&MetadataBlock>;
}

/// Write access to the metadata blocks of a frame under construction
pub trait MetadataBlockWriter: MetadataBlockReader {
  /// Replace all blocks with copies of the blocks provided by `reader`
  fn initialize_from_block_reader(&mut self, reader: &dyn MetadataBlockReader) -> Result<()>;
  fn add_block(&mut self, block: MetadataBlock) -> Result<()>;
  fn remove_block(&mut self, index: usize) -> Result<MetadataBlock>;
}

/// Ordered set of metadata blocks, at most one block per kind
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBlocks {
  format: ContainerFormat,
  blocks: Vec<MetadataBlock>,
}

impl MetadataBlocks {
  pub fn new(format: ContainerFormat) -> Self {
    Self { format, blocks: Vec::new() }
  }

  /// Split the descriptive content of a TIFF frame into blocks
  pub fn from_tiff_ifd(ifd: &IFD) -> Self {
    if ifd.has_entry(TiffCommonTag::SubIFDs) {
      log::warn!("Frame at offset {} has SubIFDs, they are not carried over", ifd.offset);
    }
    let mut blocks = Vec::new();
    blocks.push(MetadataBlock::from_ifd(BlockKind::Ifd, ifd, |tag| {
      is_encoder_owned(tag) || BlockKind::is_payload_tag(tag)
    }));
    let exif = ifd.get_sub_ifd(TiffCommonTag::ExifIFDPointer);
    if let Some(exif) = exif {
      blocks.push(MetadataBlock::from_ifd(BlockKind::Exif, exif, |tag| POINTER_TAGS.contains(&tag)));
    }
    if let Some(gps) = ifd.get_sub_ifd(ExifTag::GPSInfo) {
      blocks.push(MetadataBlock::from_ifd(BlockKind::Gps, gps, |tag| POINTER_TAGS.contains(&tag)));
    }
    if let Some(interop) = exif.and_then(|exif| exif.get_sub_ifd(ExifTag::InteropIFDPointer)) {
      blocks.push(MetadataBlock::from_ifd(BlockKind::Interop, interop, |tag| POINTER_TAGS.contains(&tag)));
    }
    for kind in BlockKind::payload_kinds() {
      if let Some(entry) = kind.payload_tag().and_then(|tag| ifd.get_entry(tag)) {
        blocks.push(MetadataBlock::new(kind, vec![Entry::new(entry.tag, entry.value.clone())]));
      }
    }
    blocks.retain(|block| !block.is_empty());
    Self {
      format: ContainerFormat::Tiff,
      blocks,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &MetadataBlock> {
    self.blocks.iter()
  }

  pub fn get(&self, kind: BlockKind) -> Option<&MetadataBlock> {
    self.blocks.iter().find(|block| block.kind == kind)
  }

  /// Write the sub-IFDs of all blocks and return the entries for the
  /// frame IFD, including the pointers to the new sub-IFDs.
  pub(crate) fn write_tiff<W: WriteAndSeek>(&self, tiff: &mut TiffWriter<W>) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();

    let interop_offset = match self.get(BlockKind::Interop) {
      Some(block) => Some(write_sub_ifd(tiff, block, &[])?),
      None => None,
    };
    let mut exif_extra = Vec::new();
    if let Some(offset) = interop_offset {
      exif_extra.push(Entry::new(ExifTag::InteropIFDPointer.into(), Value::Long(vec![offset])));
    }
    match self.get(BlockKind::Exif) {
      Some(block) => {
        let offset = write_sub_ifd(tiff, block, &exif_extra)?;
        entries.push(Entry::new(TiffCommonTag::ExifIFDPointer.into(), Value::Long(vec![offset])));
      }
      None if !exif_extra.is_empty() => {
        let offset = write_sub_ifd(tiff, &MetadataBlock::new(BlockKind::Exif, Vec::new()), &exif_extra)?;
        entries.push(Entry::new(TiffCommonTag::ExifIFDPointer.into(), Value::Long(vec![offset])));
      }
      None => {}
    }
    if let Some(block) = self.get(BlockKind::Gps) {
      let offset = write_sub_ifd(tiff, block, &[])?;
      entries.push(Entry::new(ExifTag::GPSInfo.into(), Value::Long(vec![offset])));
    }

    for block in self.iter().filter(|block| !matches!(block.kind, BlockKind::Exif | BlockKind::Gps | BlockKind::Interop)) {
      for entry in &block.entries {
        if is_encoder_owned(entry.tag) {
          log::warn!("Tag {} of {} block is owned by the encoder, skipping it", entry.tag, block.kind);
          continue;
        }
        entries.push(entry.clone());
      }
    }
    Ok(entries)
  }

  fn check_kind(&self, kind: BlockKind) -> Result<()> {
    if self.get(kind).is_some() {
      return Err(RetiffError::Codec(format!("Metadata block {} is already present", kind)));
    }
    Ok(())
  }
}

fn write_sub_ifd<W: WriteAndSeek>(tiff: &mut TiffWriter<W>, block: &MetadataBlock, extra: &[Entry]) -> Result<u32> {
  let mut dir = tiff.new_directory();
  for entry in block.entries.iter().chain(extra) {
    dir.add_entry(entry.clone());
  }
  Ok(dir.build()?)
}

impl MetadataBlockReader for MetadataBlocks {
  fn container_format(&self) -> ContainerFormat {
    self.format
  }

  fn count(&self) -> usize {
    self.blocks.len()
  }

  fn block(&self, index: usize) -> Option<&MetadataBlock> {
    self.blocks.get(index)
  }
}

impl MetadataBlockWriter for MetadataBlocks {
  fn initialize_from_block_reader(&mut self, reader: &dyn MetadataBlockReader) -> Result<()> {
    if reader.container_format() != self.format {
      return Err(RetiffError::Codec(format!(
        "Can't copy {} metadata blocks into a {} container",
        reader.container_format(),
        self.format
      )));
    }
    self.blocks.clear();
    for index in 0..reader.count() {
      let block = reader
        .block(index)
        .ok_or_else(|| RetiffError::Codec(format!("Metadata block {} vanished while copying", index)))?;
      self.add_block(block.clone())?;
    }
    Ok(())
  }

  fn add_block(&mut self, block: MetadataBlock) -> Result<()> {
    self.check_kind(block.kind)?;
    if let Some(tag) = block.kind.payload_tag() {
      if block.entries.len() != 1 || block.entries[0].tag != tag {
        return Err(RetiffError::Codec(format!("{} block must hold exactly one entry with tag {}", block.kind, tag)));
      }
    }
    self.blocks.push(block);
    self.blocks.sort_by_key(|block| block.kind);
    Ok(())
  }

  fn remove_block(&mut self, index: usize) -> Result<MetadataBlock> {
    if index >= self.blocks.len() {
      return Err(RetiffError::Codec(format!("No metadata block at index {}", index)));
    }
    Ok(self.blocks.remove(index))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::{
    bits::Endian,
    formats::tiff::{GenericTiffReader, Rational, TiffReader},
  };

  fn sample_tiff() -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut tiff = TiffWriter::new(Cursor::new(Vec::new()), Endian::Little)?;
    let interop = {
      let mut dir = tiff.new_directory();
      dir.add_tag(1_u16, "R98");
      dir.build()?
    };
    let exif = {
      let mut dir = tiff.new_directory();
      dir.add_tag(ExifTag::ExposureTime, Rational::new(1, 125));
      dir.add_tag(ExifTag::InteropIFDPointer, interop);
      dir.build()?
    };
    let mut dir = tiff.new_directory();
    dir.add_tag(TiffCommonTag::ImageWidth, 4_u32);
    dir.add_tag(TiffCommonTag::Compression, 1_u16);
    dir.add_tag(TiffCommonTag::StripOffsets, 8_u32);
    dir.add_tag(TiffCommonTag::Orientation, 1_u16);
    dir.add_tag(TiffCommonTag::Software, "scanner 2.0");
    dir.add_tag(TiffCommonTag::ExifIFDPointer, exif);
    dir.add_value(TiffCommonTag::Xmp, Value::Byte(b"<x:xmpmeta/>".to_vec()));
    dir.add_tag(65000_u16, 42_u32);
    dir.build_chained()?;
    Ok(tiff.build()?.into_inner())
  }

  #[test]
  fn split_frame_into_blocks() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let data = sample_tiff()?;
    let reader = GenericTiffReader::new_with_buffer(&data, 0, None)?;
    let blocks = MetadataBlocks::from_tiff_ifd(reader.root_ifd().ok_or("no IFD")?);

    let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BlockKind::Ifd, BlockKind::Exif, BlockKind::Interop, BlockKind::Xmp]);

    let ifd_tags: Vec<u16> = blocks.get(BlockKind::Ifd).ok_or("no IFD block")?.entries.iter().map(|e| e.tag).collect();
    assert_eq!(ifd_tags, vec![274, 305, 65000]);
    let exif_tags: Vec<u16> = blocks.get(BlockKind::Exif).ok_or("no EXIF block")?.entries.iter().map(|e| e.tag).collect();
    assert_eq!(exif_tags, vec![33434]);
    assert!(blocks.block(0).map(|b| b.entries.iter().all(|e| e.embedded.is_none())).unwrap_or(false));
    Ok(())
  }

  #[test]
  fn blocks_survive_rewrite() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let data = sample_tiff()?;
    let reader = GenericTiffReader::new_with_buffer(&data, 0, None)?;
    let blocks = MetadataBlocks::from_tiff_ifd(reader.root_ifd().ok_or("no IFD")?);

    let mut copy = MetadataBlocks::new(ContainerFormat::Tiff);
    copy.initialize_from_block_reader(&blocks)?;

    let mut tiff = TiffWriter::new(Cursor::new(Vec::new()), Endian::Big)?;
    let entries = copy.write_tiff(&mut tiff)?;
    let mut dir = tiff.new_directory();
    dir.add_tag(TiffCommonTag::ImageWidth, 4_u32);
    for entry in entries {
      dir.add_entry(entry);
    }
    dir.build_chained()?;
    let out = tiff.build()?.into_inner();

    let reader = GenericTiffReader::new_with_buffer(&out, 0, None)?;
    let reread = MetadataBlocks::from_tiff_ifd(reader.root_ifd().ok_or("no IFD")?);
    assert_eq!(reread, blocks);
    Ok(())
  }

  #[test]
  fn duplicate_and_foreign_blocks_are_rejected() {
    let mut blocks = MetadataBlocks::new(ContainerFormat::Tiff);
    let xmp = MetadataBlock::new(BlockKind::Xmp, vec![Entry::new(700, Value::Byte(vec![1]))]);
    assert!(blocks.add_block(xmp.clone()).is_ok());
    assert!(matches!(blocks.add_block(xmp), Err(RetiffError::Codec(_))));
    assert!(matches!(
      blocks.add_block(MetadataBlock::new(BlockKind::Icc, vec![Entry::new(700, Value::Byte(vec![1]))])),
      Err(RetiffError::Codec(_))
    ));

    let png = MetadataBlocks::new(ContainerFormat::Png);
    assert!(matches!(blocks.initialize_from_block_reader(&png), Err(RetiffError::Codec(_))));
    assert_eq!(blocks.count(), 1);
  }
}
