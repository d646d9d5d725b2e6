// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fmt::Debug;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Any type usable as a TIFF tag identifier
pub trait TiffTag: Into<u16> + TryFrom<u16> + Copy + Debug {}

impl TiffTag for u16 {}

/// Baseline and extension tags found in a TIFF image file directory
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u16)]
pub enum TiffCommonTag {
  NewSubFileType = 254,
  SubFileType = 255,
  ImageWidth = 256,
  ImageLength = 257,
  BitsPerSample = 258,
  Compression = 259,
  PhotometricInt = 262,
  Threshholding = 263,
  FillOrder = 266,
  DocumentName = 269,
  ImageDescription = 270,
  Make = 271,
  Model = 272,
  StripOffsets = 273,
  Orientation = 274,
  SamplesPerPixel = 277,
  RowsPerStrip = 278,
  StripByteCounts = 279,
  MinSampleValue = 280,
  MaxSampleValue = 281,
  XResolution = 282,
  YResolution = 283,
  PlanarConfiguration = 284,
  PageName = 285,
  FreeOffsets = 288,
  FreeByteCounts = 289,
  ResolutionUnit = 296,
  PageNumber = 297,
  Software = 305,
  DateTime = 306,
  Artist = 315,
  HostComputer = 316,
  Predictor = 317,
  ColorMap = 320,
  TileWidth = 322,
  TileLength = 323,
  TileOffsets = 324,
  TileByteCounts = 325,
  SubIFDs = 330,
  InkSet = 332,
  ExtraSamples = 338,
  SampleFormat = 339,
  JPEGTables = 347,
  JPEGInterchangeFormat = 513,
  JPEGInterchangeFormatLength = 514,
  YCbCrSubSampling = 530,
  Xmp = 700,
  Copyright = 33432,
  Iptc = 33723,
  Photoshop = 34377,
  ExifIFDPointer = 34665,
  IccProfile = 34675,
}

impl TiffTag for TiffCommonTag {}

/// Tags found in EXIF, GPS and interoperability sub-IFDs
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u16)]
pub enum ExifTag {
  ExposureTime = 33434,
  FNumber = 33437,
  GPSInfo = 34853,
  ISOSpeedRatings = 34855,
  ExifVersion = 36864,
  DateTimeOriginal = 36867,
  MakerNotes = 37500,
  UserComment = 37510,
  InteropIFDPointer = 40965,
}

impl TiffTag for ExifTag {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tag_conversion() {
    let tag: u16 = TiffCommonTag::Compression.into();
    assert_eq!(tag, 259);
    assert_eq!(TiffCommonTag::try_from(34665_u16).ok(), Some(TiffCommonTag::ExifIFDPointer));
    assert!(ExifTag::try_from(1_u16).is_err());
  }
}
