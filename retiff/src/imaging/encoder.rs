// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  collections::BTreeMap,
  fs::File,
  io::{BufWriter, Seek, SeekFrom, Write},
  path::{Path, PathBuf},
};

use crate::{
  Result, RetiffError,
  bits::Endian,
  compression::{
    CompressionMethod,
    predictor::{self, PREDICTOR_NONE},
  },
  formats::{
    sniff::ContainerFormat,
    tiff::{Entry, TiffWriter, Value, WriteAndSeek},
  },
  tags::TiffCommonTag,
};

use super::{
  metadata::{MetadataBlockWriter, MetadataBlocks},
  pixels::{ChunkLayout, PixelSource},
};

/// Option name selecting the compression of a TIFF frame
pub const TIFF_COMPRESSION_METHOD: &str = "TiffCompressionMethod";

const KNOWN_OPTIONS: [&str; 1] = [TIFF_COMPRESSION_METHOD];

/// Writable file stream for a new container
///
/// Data becomes durable only after [`OutputStream::commit`].
#[derive(Debug)]
pub struct OutputStream {
  path: PathBuf,
  inner: BufWriter<File>,
}

impl OutputStream {
  pub(crate) fn create(path: &Path) -> Result<Self> {
    let file = File::create(path).map_err(|err| RetiffError::with_io_error(path, err))?;
    Ok(Self {
      path: path.to_path_buf(),
      inner: BufWriter::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Flush all buffers and sync the file to disk
  pub fn commit(mut self) -> Result<()> {
    self.inner.flush().map_err(|err| RetiffError::with_io_error(&self.path, err))?;
    self.inner.get_ref().sync_all().map_err(|err| RetiffError::with_io_error(&self.path, err))?;
    log::debug!("Committed output stream {}", self.path.display());
    Ok(())
  }
}

impl Write for OutputStream {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.inner.write(buf)
  }

  fn flush(&mut self) -> std::io::Result<()> {
    self.inner.flush()
  }
}

impl Seek for OutputStream {
  fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
    self.inner.seek(pos)
  }
}

/// Value of an encoder option
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
  U8(u8),
  U16(u16),
  Bool(bool),
  F32(f32),
}

impl From<u8> for OptionValue {
  fn from(value: u8) -> Self {
    Self::U8(value)
  }
}

impl From<u16> for OptionValue {
  fn from(value: u16) -> Self {
    Self::U16(value)
  }
}

impl From<bool> for OptionValue {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<f32> for OptionValue {
  fn from(value: f32) -> Self {
    Self::F32(value)
  }
}

impl From<CompressionMethod> for OptionValue {
  fn from(value: CompressionMethod) -> Self {
    Self::U16(value.tag())
  }
}

/// Named options applied to a frame by [`FrameEncode::initialize`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
  values: BTreeMap<String, OptionValue>,
}

impl PropertyBag {
  pub fn write<V: Into<OptionValue>>(&mut self, name: &str, value: V) {
    self.values.insert(name.to_string(), value.into());
  }

  pub fn read(&self, name: &str) -> Option<OptionValue> {
    self.values.get(name).copied()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  fn compression(&self) -> Result<Option<CompressionMethod>> {
    match self.read(TIFF_COMPRESSION_METHOD) {
      None => Ok(None),
      Some(OptionValue::U8(tag)) => CompressionMethod::from_tag(tag as u16).map(Some),
      Some(OptionValue::U16(tag)) => CompressionMethod::from_tag(tag).map(Some),
      Some(value) => Err(RetiffError::Codec(format!(
        "Option {} expects an integer, got {:?}",
        TIFF_COMPRESSION_METHOD, value
      ))),
    }
  }
}

/// Encoder for a new multi-frame container
pub struct ContainerEncoder<W: WriteAndSeek> {
  format: ContainerFormat,
  tiff: TiffWriter<W>,
  deflate_block_size: usize,
}

impl<W: WriteAndSeek> ContainerEncoder<W> {
  pub(crate) fn new(format: ContainerFormat, stream: W, endian: Endian, deflate_block_size: usize) -> Result<Self> {
    if format != ContainerFormat::Tiff {
      return Err(RetiffError::Codec(format!("No encoder available for {} containers", format)));
    }
    Ok(Self {
      format,
      tiff: TiffWriter::new(stream, endian)?,
      deflate_block_size,
    })
  }

  pub fn container_format(&self) -> ContainerFormat {
    self.format
  }

  /// Number of frames committed so far
  pub fn frame_count(&self) -> usize {
    self.tiff.ifd_count()
  }

  /// Start a new frame, it must be committed before the next one is created
  pub fn create_new_frame(&mut self) -> Result<(FrameEncode<'_, W>, PropertyBag)> {
    let index = self.tiff.ifd_count();
    log::debug!("Creating output frame {}", index);
    let frame = FrameEncode {
      index,
      tiff: &mut self.tiff,
      deflate_block_size: self.deflate_block_size,
      compression: None,
      blocks: MetadataBlocks::new(self.format),
      pixels: None,
    };
    Ok((frame, PropertyBag::default()))
  }

  /// Finish the container, at least one frame must be committed
  pub fn commit(self) -> Result<()> {
    let frames = self.tiff.ifd_count();
    self.tiff.build()?;
    log::debug!("Committed {} container with {} frames", self.format, frames);
    Ok(())
  }
}

/// Chunks of a frame already written to the stream
struct WrittenPixels {
  format: BTreeMap<u16, Entry>,
  layout: ChunkLayout,
  predictor: u16,
  offsets: Vec<u32>,
  byte_counts: Vec<u32>,
}

/// A frame under construction
///
/// Call order: `initialize`, optional metadata through `block_writer`,
/// `write_source`, `commit`.
pub struct FrameEncode<'a, W: WriteAndSeek> {
  index: usize,
  tiff: &'a mut TiffWriter<W>,
  deflate_block_size: usize,
  compression: Option<CompressionMethod>,
  blocks: MetadataBlocks,
  pixels: Option<WrittenPixels>,
}

impl<'a, W: WriteAndSeek> FrameEncode<'a, W> {
  pub fn index(&self) -> usize {
    self.index
  }

  /// Apply encoder options, must be called before any pixels are written
  pub fn initialize(&mut self, options: &PropertyBag) -> Result<()> {
    if self.compression.is_some() {
      return Err(RetiffError::Codec(format!("Frame {} is already initialized", self.index)));
    }
    if let Some(name) = options.names().find(|name| !KNOWN_OPTIONS.contains(name)) {
      return Err(RetiffError::Codec(format!("Unknown encoder option: {}", name)));
    }
    let compression = options.compression()?.unwrap_or(CompressionMethod::Uncompressed);
    log::debug!("Frame {} initialized with compression {}", self.index, compression);
    self.compression = Some(compression);
    Ok(())
  }

  pub fn block_writer(&mut self) -> Option<&mut dyn MetadataBlockWriter> {
    Some(&mut self.blocks)
  }

  /// Compress and write all chunks of `source`
  pub fn write_source(&mut self, source: &PixelSource) -> Result<()> {
    let compression = self
      .compression
      .ok_or_else(|| RetiffError::Codec(format!("Frame {} must be initialized before writing pixels", self.index)))?;
    if self.pixels.is_some() {
      return Err(RetiffError::Codec(format!("Pixels of frame {} are already written", self.index)));
    }
    if source.endian != self.tiff.endian() {
      return Err(RetiffError::Codec(format!(
        "Pixel data in {:?} byte order can't be written to a {:?} container",
        source.endian,
        self.tiff.endian()
      )));
    }

    let predictor = if compression.supports_predictor() { source.predictor } else { PREDICTOR_NONE };
    let mut offsets = Vec::with_capacity(source.chunks.len());
    let mut byte_counts = Vec::with_capacity(source.chunks.len());
    for (index, chunk) in source.chunks.iter().enumerate() {
      let packed = if predictor == PREDICTOR_NONE {
        compression.compress(chunk, self.deflate_block_size)?
      } else {
        let mut chunk = chunk.clone();
        let (layout, _) = source.chunk_geometry(index);
        predictor::apply(predictor, &mut chunk, layout, source.endian)?;
        compression.compress(&chunk, self.deflate_block_size)?
      };
      offsets.push(self.tiff.write_data(&packed)?);
      byte_counts.push(packed.len() as u32);
    }
    log::debug!(
      "Frame {}: wrote {} chunks, {} bytes decoded, {} bytes stored",
      self.index,
      offsets.len(),
      source.byte_size(),
      byte_counts.iter().map(|c| *c as u64).sum::<u64>()
    );

    self.pixels = Some(WrittenPixels {
      format: source.format.clone(),
      layout: source.layout,
      predictor,
      offsets,
      byte_counts,
    });
    Ok(())
  }

  /// Write the frame IFD and append it to the container
  pub fn commit(self) -> Result<()> {
    let compression = self
      .compression
      .ok_or_else(|| RetiffError::Codec(format!("Frame {} committed without initialization", self.index)))?;
    let pixels = self
      .pixels
      .ok_or_else(|| RetiffError::Codec(format!("Frame {} committed without pixel data", self.index)))?;

    let metadata = self.blocks.write_tiff(self.tiff)?;

    let mut dir = self.tiff.new_directory();
    for entry in pixels.format.into_values() {
      dir.add_entry(entry);
    }
    dir.add_tag(TiffCommonTag::Compression, compression.tag());
    if pixels.predictor != PREDICTOR_NONE {
      dir.add_tag(TiffCommonTag::Predictor, pixels.predictor);
    }
    let (offsets_tag, counts_tag) = match pixels.layout {
      ChunkLayout::Strips { .. } => (TiffCommonTag::StripOffsets, TiffCommonTag::StripByteCounts),
      ChunkLayout::Tiles { .. } => (TiffCommonTag::TileOffsets, TiffCommonTag::TileByteCounts),
    };
    dir.add_value(offsets_tag, Value::Long(pixels.offsets));
    dir.add_value(counts_tag, Value::Long(pixels.byte_counts));
    for entry in metadata {
      dir.add_entry(entry);
    }
    let offset = dir.build_chained()?;
    log::debug!("Frame {} committed, IFD at offset {}", self.index, offset);
    Ok(())
  }
}
