// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::Path;

use crate::{
  CompressionMethod, ImagingFactory, Result, RetiffError,
  bits::Endian,
  formats::tiff::WriteAndSeek,
  imaging::{ContainerDecoder, ContainerEncoder, FrameDecode, TIFF_COMPRESSION_METHOD},
  inspect::open_tiff,
};

/// Re-encode every frame of `source` into a new file at `dest`
///
/// Frames are decoded and written in order with the compression given
/// by the raw tag `method`, metadata blocks are copied per frame.
/// `source` is never modified. On failure `dest` may contain a partial
/// container and must not be used.
pub fn transcode<P: AsRef<Path>, Q: AsRef<Path>>(factory: &ImagingFactory, source: P, dest: Q, method: u16) -> Result<()> {
  let (source, dest) = (source.as_ref(), dest.as_ref());
  let decoder = open_tiff(factory, source)?;
  let method = CompressionMethod::from_tag(method)?;
  let endian = decoder.byte_order().unwrap_or(Endian::Little);

  log::info!("Transcoding {} to {} with {}", source.display(), dest.display(), method);
  let mut stream = factory.create_stream(dest)?;
  {
    let mut encoder = factory.create_encoder_with_byte_order(decoder.container_format(), &mut stream, endian)?;
    transcode_frames(&decoder, &mut encoder, method)?;
    encoder.commit()?;
  }
  stream.commit()
}

/// Transcode all frames of `decoder` into `encoder`, aborting on the first failure
pub(crate) fn transcode_frames<W: WriteAndSeek>(decoder: &ContainerDecoder, encoder: &mut ContainerEncoder<W>, method: CompressionMethod) -> Result<()> {
  let count = decoder.frame_count()?;
  for index in 0..count {
    let frame = decoder.frame(index)?;
    transcode_frame(&frame, encoder, method)?;
  }
  log::debug!("Transcoded {} frames of {}", count, decoder.path().display());
  Ok(())
}

fn transcode_frame<W: WriteAndSeek>(frame: &FrameDecode<'_>, encoder: &mut ContainerEncoder<W>, method: CompressionMethod) -> Result<()> {
  let (mut output, mut options) = encoder.create_new_frame()?;
  options.write(TIFF_COMPRESSION_METHOD, method);
  output.initialize(&options)?;

  let blocks = frame
    .block_reader()
    .ok_or_else(|| RetiffError::Codec(format!("Frame {} has no metadata block reader", frame.index())))?;
  let index = output.index();
  let writer = output
    .block_writer()
    .ok_or_else(|| RetiffError::Codec(format!("Frame {} has no metadata block writer", index)))?;
  writer.initialize_from_block_reader(blocks)?;

  let pixels = frame.pixel_source()?;
  output.write_source(&pixels)?;
  output.commit()?;
  if let Some((width, length)) = frame.dimensions() {
    log::debug!(
      "Frame {} ({}x{}) transcoded, {} metadata blocks copied",
      frame.index(),
      width,
      length,
      blocks.count()
    );
  }
  Ok(())
}
