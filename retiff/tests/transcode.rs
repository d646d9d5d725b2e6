// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

mod common;

use std::{fs, path::Path};

use common::{FrameSpec, TestResult, init_test_logger, write_png, write_tiff};
use retiff::{
  ImagingFactory, RetiffError,
  bits::Endian,
  imaging::{BlockKind, MetadataBlock, PixelSource},
  inspect, inspect_container, replace, transcode,
};

fn frame_blocks(factory: &ImagingFactory, path: &Path) -> TestResult<Vec<Vec<MetadataBlock>>> {
  let decoder = factory.create_decoder_from_path(path)?;
  let mut frames = Vec::new();
  for index in 0..decoder.frame_count()? {
    let frame = decoder.frame(index)?;
    let reader = frame.block_reader().ok_or("no block reader")?;
    frames.push((0..reader.count()).filter_map(|i| reader.block(i).cloned()).collect());
  }
  Ok(frames)
}

fn frame_pixels(factory: &ImagingFactory, path: &Path) -> TestResult<Vec<PixelSource>> {
  let decoder = factory.create_decoder_from_path(path)?;
  let mut frames = Vec::new();
  for index in 0..decoder.frame_count()? {
    frames.push(decoder.frame(index)?.pixel_source()?);
  }
  Ok(frames)
}

fn assert_same_content(factory: &ImagingFactory, source: &Path, dest: &Path) -> TestResult {
  let before = frame_pixels(factory, source)?;
  let after = frame_pixels(factory, dest)?;
  assert_eq!(before.len(), after.len());
  for (a, b) in before.iter().zip(after.iter()) {
    assert_eq!(a.chunks, b.chunks);
    assert_eq!(a.format, b.format);
    assert_eq!(a.layout, b.layout);
  }
  assert_eq!(frame_blocks(factory, source)?, frame_blocks(factory, dest)?);
  Ok(())
}

mod inspecting {
  use super::*;

  #[test]
  fn inspect_leaves_file_untouched() -> TestResult {
    init_test_logger();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scan.tif");
    write_tiff(&path, Endian::Little, &[FrameSpec::strips(32, 20, 8).compressed(5, 2)])?;
    let before = fs::read(&path)?;
    let modified = fs::metadata(&path)?.modified()?;

    let factory = ImagingFactory::new();
    assert_eq!(inspect(&factory, &path)?, 5);
    assert_eq!(fs::read(&path)?, before);
    assert_eq!(fs::metadata(&path)?.modified()?, modified);
    Ok(())
  }

  #[test]
  fn inspect_reports_first_frame_only() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mixed.tif");
    write_tiff(
      &path,
      Endian::Big,
      &[FrameSpec::strips(16, 16, 4).compressed(8, 1), FrameSpec::strips(16, 16, 4)],
    )?;

    let factory = ImagingFactory::new();
    assert_eq!(inspect(&factory, &path)?, 8);
    let info = inspect_container(&factory, &path)?;
    assert_eq!(info.frame_count(), 2);
    assert_eq!(info.compressions, vec![8, 1]);
    Ok(())
  }

  #[test]
  fn foreign_compression_is_reported() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("jpeg.tif");
    write_tiff(&path, Endian::Little, &[FrameSpec::strips(8, 8, 8).compressed(7, 1)])?;

    let factory = ImagingFactory::new();
    assert_eq!(inspect(&factory, &path)?, 7);
    let dest = dir.path().join("jpeg-temp.tif");
    let result = transcode(&factory, &path, &dest, 8);
    assert!(matches!(result, Err(RetiffError::Codec(_))), "{:?}", result);
    Ok(())
  }

  #[test]
  fn png_is_not_tiff() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("image.png");
    write_png(&path)?;
    let before = fs::read(&path)?;

    let factory = ImagingFactory::new();
    assert!(matches!(inspect(&factory, &path), Err(RetiffError::NotTiff(_))));
    let dest = dir.path().join("image-temp.png");
    assert!(matches!(transcode(&factory, &path, &dest, 8), Err(RetiffError::NotTiff(_))));
    assert!(!dest.exists());
    assert_eq!(fs::read(&path)?, before);
    Ok(())
  }

  #[test]
  fn container_without_frames_lacks_metadata() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.tif");
    fs::write(&path, [b'I', b'I', 42, 0, 0, 0, 0, 0])?;

    let factory = ImagingFactory::new();
    assert!(matches!(inspect(&factory, &path), Err(RetiffError::MetadataMissing(_))));
    Ok(())
  }
}

mod transcoding {
  use super::*;

  fn fixture(path: &Path) -> TestResult {
    write_tiff(
      path,
      Endian::Little,
      &[
        FrameSpec::strips(40, 30, 7),
        FrameSpec::strips(24, 24, 24).compressed(5, 2),
        FrameSpec::tiles(40, 40, 16, 16).compressed(8, 1),
        FrameSpec::strips(20, 10, 3).gray16().compressed(8, 2).without_metadata(),
      ],
    )
  }

  fn roundtrip(method: u16) -> TestResult {
    init_test_logger();
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("multi.tif");
    let dest = dir.path().join("multi-temp.tif");
    fixture(&source)?;
    let original = fs::read(&source)?;

    let factory = ImagingFactory::new();
    transcode(&factory, &source, &dest, method)?;
    assert_eq!(fs::read(&source)?, original);

    let info = inspect_container(&factory, &dest)?;
    assert_eq!(info.compressions, vec![method; 4]);
    assert_same_content(&factory, &source, &dest)
  }

  #[test]
  fn transcode_to_uncompressed() -> TestResult {
    roundtrip(1)
  }

  #[test]
  fn transcode_to_lzw() -> TestResult {
    roundtrip(5)
  }

  #[test]
  fn transcode_to_deflate() -> TestResult {
    roundtrip(8)
  }

  #[test]
  fn predictor_follows_target_method() -> TestResult {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("pred.tif");
    write_tiff(&source, Endian::Little, &[FrameSpec::strips(24, 12, 4).gray16().compressed(5, 2)])?;
    let factory = ImagingFactory::new();

    let plain = dir.path().join("pred-plain.tif");
    transcode(&factory, &source, &plain, 1)?;
    let decoder = factory.create_decoder_from_path(&plain)?;
    assert!(!decoder.frame(0)?.metadata_query_reader().contains(317_u16));

    let zipped = dir.path().join("pred-zip.tif");
    transcode(&factory, &source, &zipped, 8)?;
    let decoder = factory.create_decoder_from_path(&zipped)?;
    assert_eq!(decoder.frame(0)?.metadata_query_reader().get_u16(317_u16), Some(2));

    assert_same_content(&factory, &source, &plain)?;
    assert_same_content(&factory, &source, &zipped)
  }

  #[test]
  fn byte_order_is_preserved() -> TestResult {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("motorola.tif");
    let dest = dir.path().join("motorola-temp.tif");
    write_tiff(&source, Endian::Big, &[FrameSpec::strips(16, 9, 2).gray16().compressed(8, 2)])?;

    let factory = ImagingFactory::new();
    transcode(&factory, &source, &dest, 5)?;
    assert_eq!(&fs::read(&dest)?[0..2], b"MM");
    assert_same_content(&factory, &source, &dest)
  }

  #[test]
  fn metadata_blocks_are_copied() -> TestResult {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("meta.tif");
    let dest = dir.path().join("meta-temp.tif");
    write_tiff(&source, Endian::Little, &[FrameSpec::strips(8, 8, 8), FrameSpec::strips(8, 8, 8)])?;

    let factory = ImagingFactory::new();
    transcode(&factory, &source, &dest, 8)?;
    let frames = frame_blocks(&factory, &dest)?;
    assert_eq!(frames.len(), 2);
    for blocks in &frames {
      let kinds: Vec<BlockKind> = blocks.iter().map(|block| block.kind).collect();
      assert_eq!(kinds, vec![BlockKind::Ifd, BlockKind::Exif, BlockKind::Gps, BlockKind::Xmp, BlockKind::Icc]);
    }
    let decoder = factory.create_decoder_from_path(&dest)?;
    let query = decoder.frame(1)?.metadata_query_reader();
    assert_eq!(query.get_string(315_u16).map(String::as_str), Some("frame 1"));
    assert_eq!(query.get_u32(65000_u16), Some(0xdead_beef));
    Ok(())
  }

  #[test]
  fn unsupported_target_creates_nothing() -> TestResult {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("fax.tif");
    let dest = dir.path().join("fax-temp.tif");
    write_tiff(&source, Endian::Little, &[FrameSpec::strips(8, 8, 8)])?;

    let factory = ImagingFactory::new();
    assert!(matches!(
      transcode(&factory, &source, &dest, 7),
      Err(RetiffError::UnsupportedMethod(7))
    ));
    assert!(!dest.exists());
    Ok(())
  }

  #[test]
  fn failing_frame_aborts_transcode() -> TestResult {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("broken.tif");
    let dest = dir.path().join("broken-temp.tif");
    write_tiff(
      &source,
      Endian::Little,
      &[FrameSpec::strips(16, 16, 4), FrameSpec::strips(16, 16, 4).broken()],
    )?;
    let original = fs::read(&source)?;

    let factory = ImagingFactory::new();
    let result = transcode(&factory, &source, &dest, 8);
    assert!(matches!(result, Err(RetiffError::Codec(_))), "{:?}", result);
    assert_eq!(fs::read(&source)?, original);
    Ok(())
  }

  #[test]
  fn compress_and_replace_three_frames() -> TestResult {
    init_test_logger();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pages.tif");
    let temp = dir.path().join("pages-temp.tif");
    write_tiff(
      &path,
      Endian::Little,
      &[FrameSpec::strips(64, 64, 16), FrameSpec::strips(64, 64, 16), FrameSpec::strips(64, 64, 16)],
    )?;
    let original_size = fs::metadata(&path)?.len();
    let factory = ImagingFactory::new();
    assert_eq!(inspect(&factory, &path)?, 1);

    transcode(&factory, &path, &temp, 8)?;
    let new_size = fs::metadata(&temp)?.len();
    replace(&path, &temp)?;

    assert!(new_size <= original_size);
    assert!(!temp.exists());
    assert_eq!(inspect_container(&factory, &path)?.compressions, vec![8, 8, 8]);
    assert_eq!(fs::metadata(&path)?.len(), new_size);
    Ok(())
  }
}
