// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

#![allow(dead_code)]

use std::{fs::File, io::BufWriter, path::Path};

use retiff::{
  CompressionMethod,
  bits::Endian,
  compression::predictor::{self, RowLayout},
  formats::tiff::{Rational, TiffWriter, Value},
  imaging::ChunkLayout,
  tags::{ExifTag, TiffCommonTag},
};

pub(crate) type TestResult<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

pub(crate) fn init_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Description of a frame written by [`write_tiff`]
#[derive(Debug, Clone)]
pub(crate) struct FrameSpec {
  pub width: u32,
  pub length: u32,
  pub samples: u16,
  pub bits: u16,
  pub compression: u16,
  pub predictor: u16,
  pub layout: ChunkLayout,
  pub metadata: bool,
  /// Corrupt the first chunk offset so decoding fails
  pub broken: bool,
}

impl FrameSpec {
  pub fn strips(width: u32, length: u32, rows_per_strip: u32) -> Self {
    Self {
      width,
      length,
      samples: 3,
      bits: 8,
      compression: 1,
      predictor: 1,
      layout: ChunkLayout::Strips { rows_per_strip },
      metadata: true,
      broken: false,
    }
  }

  pub fn tiles(width: u32, length: u32, tile_width: u32, tile_length: u32) -> Self {
    Self {
      layout: ChunkLayout::Tiles {
        width: tile_width,
        length: tile_length,
      },
      ..Self::strips(width, length, length)
    }
  }

  pub fn compressed(self, compression: u16, predictor: u16) -> Self {
    Self {
      compression,
      predictor,
      ..self
    }
  }

  pub fn gray16(self) -> Self {
    Self {
      samples: 1,
      bits: 16,
      ..self
    }
  }

  pub fn without_metadata(self) -> Self {
    Self { metadata: false, ..self }
  }

  pub fn broken(self) -> Self {
    Self { broken: true, ..self }
  }

  fn row_layout(&self) -> RowLayout {
    let width = match self.layout {
      ChunkLayout::Strips { .. } => self.width,
      ChunkLayout::Tiles { width, .. } => width,
    };
    RowLayout {
      width: width as usize,
      samples: self.samples as usize,
      bits_per_sample: self.bits,
    }
  }

  /// Decoded chunk payloads of frame `frame`
  pub fn chunks(&self, frame: usize) -> Vec<Vec<u8>> {
    let row_bytes = self.row_layout().row_bytes().expect("row size");
    let rows: Vec<usize> = match self.layout {
      ChunkLayout::Strips { rows_per_strip } => {
        let rps = rows_per_strip.max(1) as usize;
        (0..self.length as usize).step_by(rps).map(|first| rps.min(self.length as usize - first)).collect()
      }
      ChunkLayout::Tiles { width, length } => {
        let across = self.width.div_ceil(width) as usize;
        let down = self.length.div_ceil(length) as usize;
        vec![length as usize; across * down]
      }
    };
    rows
      .iter()
      .enumerate()
      .map(|(chunk, rows)| {
        (0..rows * row_bytes)
          .map(|i| ((i % row_bytes) / 3 + (i / row_bytes) * 2 + chunk * 5 + frame * 11) as u8)
          .collect()
      })
      .collect()
  }
}

/// Write a TIFF file with one IFD per frame spec
pub(crate) fn write_tiff(path: &Path, endian: Endian, frames: &[FrameSpec]) -> TestResult {
  let mut tiff = TiffWriter::new(BufWriter::new(File::create(path)?), endian)?;
  for (index, spec) in frames.iter().enumerate() {
    let mut offsets = Vec::new();
    let mut counts = Vec::new();
    for chunk in spec.chunks(index) {
      let stored = match spec.compression {
        1 | 5 | 8 => {
          let mut chunk = chunk;
          if spec.predictor != 1 {
            predictor::apply(spec.predictor, &mut chunk, spec.row_layout(), endian)?;
          }
          CompressionMethod::from_tag(spec.compression)?.compress(&chunk, 65536)?
        }
        // Opaque payload for codecs that are only inspected
        _ => vec![0xff, 0xd8, 0xff, 0xd9],
      };
      offsets.push(tiff.write_data(&stored)?);
      counts.push(stored.len() as u32);
    }
    if spec.broken {
      offsets[0] = u32::MAX - 16;
    }

    let (exif, gps) = if spec.metadata {
      let exif = {
        let mut dir = tiff.new_directory();
        dir.add_tag(ExifTag::ExposureTime, Rational::new(1, 60 + index as u32));
        dir.add_tag(ExifTag::ISOSpeedRatings, 200_u16);
        dir.add_tag(ExifTag::DateTimeOriginal, "2021:06:01 12:00:00");
        dir.build()?
      };
      let gps = {
        let mut dir = tiff.new_directory();
        dir.add_value(0_u16, Value::Byte(vec![2, 3, 0, 0]));
        dir.add_tag(1_u16, "N");
        dir.build()?
      };
      (Some(exif), Some(gps))
    } else {
      (None, None)
    };

    let mut dir = tiff.new_directory();
    dir.add_tag(TiffCommonTag::NewSubFileType, if index == 0 { 0_u32 } else { 2_u32 });
    dir.add_tag(TiffCommonTag::ImageWidth, spec.width);
    dir.add_tag(TiffCommonTag::ImageLength, spec.length);
    dir.add_value(TiffCommonTag::BitsPerSample, Value::Short(vec![spec.bits; spec.samples as usize]));
    dir.add_tag(TiffCommonTag::Compression, spec.compression);
    dir.add_tag(TiffCommonTag::PhotometricInt, if spec.samples == 3 { 2_u16 } else { 1_u16 });
    dir.add_tag(TiffCommonTag::SamplesPerPixel, spec.samples);
    dir.add_tag(TiffCommonTag::PlanarConfiguration, 1_u16);
    if spec.predictor != 1 {
      dir.add_tag(TiffCommonTag::Predictor, spec.predictor);
    }
    match spec.layout {
      ChunkLayout::Strips { rows_per_strip } => {
        dir.add_tag(TiffCommonTag::RowsPerStrip, rows_per_strip);
        dir.add_tag(TiffCommonTag::StripOffsets, offsets);
        dir.add_tag(TiffCommonTag::StripByteCounts, counts);
      }
      ChunkLayout::Tiles { width, length } => {
        dir.add_tag(TiffCommonTag::TileWidth, width);
        dir.add_tag(TiffCommonTag::TileLength, length);
        dir.add_tag(TiffCommonTag::TileOffsets, offsets);
        dir.add_tag(TiffCommonTag::TileByteCounts, counts);
      }
    }
    if spec.metadata {
      dir.add_tag(TiffCommonTag::XResolution, Rational::new(300, 1));
      dir.add_tag(TiffCommonTag::YResolution, Rational::new(300, 1));
      dir.add_tag(TiffCommonTag::ResolutionUnit, 2_u16);
      dir.add_tag(TiffCommonTag::PageNumber, [index as u16, frames.len() as u16]);
      dir.add_tag(TiffCommonTag::Software, "retiff fixture");
      dir.add_tag(TiffCommonTag::Artist, format!("frame {}", index));
      dir.add_value(TiffCommonTag::Xmp, Value::Byte(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>".to_vec()));
      dir.add_value(TiffCommonTag::IccProfile, Value::Undefined(vec![0, 0, 2, 0x30, 0x61, 0x63, 0x73, 0x70]));
      dir.add_tag(65000_u16, 0xdead_beef_u32);
      if let (Some(exif), Some(gps)) = (exif, gps) {
        dir.add_tag(TiffCommonTag::ExifIFDPointer, exif);
        dir.add_tag(ExifTag::GPSInfo, gps);
      }
    }
    dir.build_chained()?;
  }
  tiff.build()?;
  Ok(())
}

/// Minimal PNG signature and header chunk
pub(crate) fn write_png(path: &Path) -> TestResult {
  let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
  data.extend_from_slice(&[0, 0, 0, 13]);
  data.extend_from_slice(b"IHDR");
  data.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]);
  data.extend_from_slice(&[0x3a, 0x7e, 0x9b, 0x55]);
  std::fs::write(path, data)?;
  Ok(())
}
