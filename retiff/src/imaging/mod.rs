// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Imaging layer: container decoders, frame decoders, metadata blocks
//! and container encoders, created through an [`ImagingFactory`].

use std::path::Path;

use crate::{
  Result, bits::Endian, compression::deflate::DEFAULT_BLOCK_SIZE, envparams, formats::sniff::ContainerFormat,
  formats::tiff::WriteAndSeek,
};

pub mod decoder;
pub mod encoder;
pub mod metadata;
pub mod pixels;

pub use decoder::{ContainerDecoder, FrameDecode, MetadataQueryReader};
pub use encoder::{ContainerEncoder, FrameEncode, OptionValue, OutputStream, PropertyBag, TIFF_COMPRESSION_METHOD};
pub use metadata::{BlockKind, MetadataBlock, MetadataBlockReader, MetadataBlockWriter, MetadataBlocks};
pub use pixels::{ChunkLayout, PixelSource};

/// Tuning parameters of the imaging layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingParams {
  /// Block size passed to the deflate encoder
  pub deflate_block_size: usize,
}

impl Default for ImagingParams {
  fn default() -> Self {
    Self {
      deflate_block_size: envparams::retiff_deflate_block_size().unwrap_or(DEFAULT_BLOCK_SIZE),
    }
  }
}

/// Entry point for all decoders and encoders
///
/// Created once by the caller and passed to every operation.
#[derive(Debug, Clone, Default)]
pub struct ImagingFactory {
  params: ImagingParams,
}

impl ImagingFactory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_params(params: ImagingParams) -> Self {
    Self { params }
  }

  pub fn params(&self) -> &ImagingParams {
    &self.params
  }

  /// Open a container for read-only decoding
  pub fn create_decoder_from_path<P: AsRef<Path>>(&self, path: P) -> Result<ContainerDecoder> {
    ContainerDecoder::open(path.as_ref())
  }

  /// Create a stream for a new file, prior contents are truncated
  pub fn create_stream<P: AsRef<Path>>(&self, path: P) -> Result<OutputStream> {
    OutputStream::create(path.as_ref())
  }

  /// Create an encoder writing little endian containers
  pub fn create_encoder<W: WriteAndSeek>(&self, format: ContainerFormat, stream: W) -> Result<ContainerEncoder<W>> {
    self.create_encoder_with_byte_order(format, stream, Endian::Little)
  }

  /// Create an encoder writing containers in the given byte order
  pub fn create_encoder_with_byte_order<W: WriteAndSeek>(
    &self,
    format: ContainerFormat,
    stream: W,
    endian: Endian,
  ) -> Result<ContainerEncoder<W>> {
    ContainerEncoder::new(format, stream, endian, self.params.deflate_block_size)
  }
}
