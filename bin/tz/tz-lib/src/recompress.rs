// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{fs, io::Write};

use log::{debug, info, warn};
use retiff::{CompressionMethod, ImagingFactory, envparams, inspect, inspect_container, remove_stale, replace, transcode};

use crate::{AppError, Result, app::Args, filemap::FileMap, report};

/// What a run did to the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// `/i` was given, the compression was only printed
  InfoOnly { compression: u16 },
  /// The file already uses the requested method
  Unchanged { compression: u16 },
  Rewritten { compression: u16, original_size: u64, new_size: u64 },
}

/// Inspect the input and rewrite it with the requested compression
///
/// Report lines go to `out`. The input is only replaced after the
/// transcoded copy was completely written (and verified, unless
/// disabled by `RETIFF_VERIFY_OUTPUT=0`). A failed transcode deletes the
/// temporary copy and leaves the input untouched.
pub fn recompress<W: Write>(factory: &ImagingFactory, args: &Args, out: &mut W) -> Result<Outcome> {
  writeln!(out, "{}", report::input_file(&args.path))?;
  let map = FileMap::new(&args.path, !args.info_only)?;
  debug!("Input {}, temporary output {}", map.src.display(), map.temp.display());
  remove_stale(&map.temp)?;

  let compression = match inspect(factory, &map.src) {
    Ok(compression) => compression,
    Err(err) => {
      writeln!(out, "{}", report::inspect_failure(&err))?;
      return Err(err.into());
    }
  };
  writeln!(out, "{}", report::current_compression(compression, &map.src))?;

  if args.info_only {
    return Ok(Outcome::InfoOnly { compression });
  }
  if compression == args.method.tag() {
    info!("{} already uses {}, nothing to do", map.src.display(), args.method);
    return Ok(Outcome::Unchanged { compression });
  }

  if let Err(err) = transcode(factory, &map.src, &map.temp, args.method.tag()) {
    discard(&map);
    return Err(err.into());
  }
  if envparams::retiff_verify_output() {
    if let Err(err) = verify(factory, &map, args.method) {
      discard(&map);
      return Err(err);
    }
  } else {
    debug!("Verification of {} disabled", map.temp.display());
  }

  let original_size = fs::metadata(&map.src)?.len();
  let new_size = fs::metadata(&map.temp)?.len();
  if let Err(err) = replace(&map.src, &map.temp) {
    writeln!(out, "{}", report::replace_failure(&err))?;
    return Err(err.into());
  }
  writeln!(out, "{}", report::sizes(original_size, new_size))?;
  Ok(Outcome::Rewritten {
    compression,
    original_size,
    new_size,
  })
}

/// Check that the transcoded copy has every frame in the new compression
fn verify(factory: &ImagingFactory, map: &FileMap, method: CompressionMethod) -> Result<()> {
  let source = inspect_container(factory, &map.src)?;
  let output = inspect_container(factory, &map.temp)?;
  if source.frame_count() != output.frame_count() {
    return Err(AppError::Verification(format!(
      "{} has {} frames, but {} has {}",
      map.src.display(),
      source.frame_count(),
      map.temp.display(),
      output.frame_count()
    )));
  }
  if let Some((index, found)) = output.compressions.iter().enumerate().find(|(_, c)| **c != method.tag()) {
    return Err(AppError::Verification(format!(
      "Frame {} of {} has compression {}, expected {}",
      index,
      map.temp.display(),
      found,
      method.tag()
    )));
  }
  debug!("Verified {} frames of {}", output.frame_count(), map.temp.display());
  Ok(())
}

fn discard(map: &FileMap) {
  if let Err(err) = remove_stale(&map.temp) {
    warn!("Unable to delete temporary file {}: {}", map.temp.display(), err);
  }
}
