// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::{
  Entry, Result, TiffError, Value,
  entry::ENTRY_SIZE,
  reader::{EndianReader, ReadByteOrder},
};
use crate::{bits::Endian, tags::TiffTag};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
  collections::BTreeMap,
  io::{Read, Seek, SeekFrom},
};

// Sub-IFDs nest at most Exif -> Interop, anything deeper is corrupt or cyclic
const MAX_SUB_IFD_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IFD {
  pub offset: u32,
  pub base: u32,
  pub next_ifd: u32,
  pub entries: BTreeMap<u16, Entry>,
  pub endian: Endian,
  pub sub: BTreeMap<u16, Vec<IFD>>,
}

impl IFD {
  /// Parse the IFD at `offset` (relative to `base`), following
  /// pointer entries listed in `sub_tags` into sub-IFDs.
  pub fn new<R: Read + Seek>(reader: &mut R, offset: u32, base: u32, endian: Endian, sub_tags: &[u16]) -> Result<IFD> {
    Self::parse(reader, offset, base, endian, sub_tags, 0)
  }

  fn parse<R: Read + Seek>(reader: &mut R, offset: u32, base: u32, endian: Endian, sub_tags: &[u16], depth: usize) -> Result<IFD> {
    reader.seek(SeekFrom::Start((base + offset) as u64))?;
    let mut sub_ifd_offsets = BTreeMap::new();
    let mut reader = EndianReader::new(reader, endian);
    let entry_count = reader.read_u16()?;
    let mut entries = BTreeMap::new();
    let mut sub = BTreeMap::new();
    let mut next_pos = reader.position()?;
    debug!("Parse {} entries of IFD at offset {}", entry_count, offset);
    for _ in 0..entry_count {
      reader.goto(next_pos)?;
      next_pos += ENTRY_SIZE;
      let tag = reader.read_u16()?;

      match Entry::parse(&mut reader, base, tag) {
        Ok(entry) => {
          if sub_tags.contains(&tag) {
            match &entry.value {
              Value::Long(offsets) => {
                sub_ifd_offsets.insert(tag, offsets.clone());
              }
              val => {
                log::info!(
                  "Found IFD offset tag, but type mismatch: {:?}. Ignoring SubIFD parsing for tag 0x{:X}",
                  val,
                  tag
                );
              }
            }
          }
          entries.insert(entry.tag, entry);
        }
        Err(err) => {
          log::info!("Failed to parse TIFF tag 0x{:X}, skipping: {:?}", tag, err);
        }
      }
    }

    // Some TIFF writers skip the next ifd pointer
    // If we get an I/O error, we fallback to 0, signaling the end of IFD chains.
    reader.goto(next_pos)?;
    let next_ifd = match reader.read_u32() {
      Ok(ptr) => ptr,
      Err(e) => {
        debug!(
          "TIFF IFD reader failed to get next IFD pointer, fallback to 0 and continue. Original error was: {}",
          e
        );
        0
      }
    };

    // Process SubIFDs
    let reader = reader.into_inner();
    if depth < MAX_SUB_IFD_DEPTH {
      for (tag, offsets) in sub_ifd_offsets {
        let mut ifds = Vec::new();
        for offset in offsets {
          match Self::parse(reader, offset, base, endian, sub_tags, depth + 1) {
            Ok(ifd) => ifds.push(ifd),
            Err(err) => {
              log::warn!("Error while processing TIFF sub-IFD for tag 0x{:X}, ignoring it: {}", tag, err);
            }
          };
        }
        sub.insert(tag, ifds);
      }
    } else {
      log::warn!("TIFF sub-IFD nesting exceeds {} levels, ignoring deeper IFDs", MAX_SUB_IFD_DEPTH);
    }

    Ok(IFD {
      offset,
      base,
      next_ifd,
      entries,
      endian,
      sub,
    })
  }

  pub fn entry_count(&self) -> u16 {
    self.entries.len() as u16
  }

  pub fn next_ifd(&self) -> u32 {
    self.next_ifd
  }

  pub fn entries(&self) -> &BTreeMap<u16, Entry> {
    &self.entries
  }

  pub fn get_entry<T: TiffTag>(&self, tag: T) -> Option<&Entry> {
    self.entries.get(&tag.into())
  }

  pub fn has_entry<T: TiffTag>(&self, tag: T) -> bool {
    self.get_entry(tag).is_some()
  }

  /// Get a single integer value of a tag, failing if the tag is missing
  pub fn require_u32<T: TiffTag>(&self, tag: T) -> Result<u32> {
    self
      .get_entry(tag)
      .map(|entry| entry.get_u32(0))
      .transpose()?
      .flatten()
      .ok_or_else(|| TiffError::General(format!("Required tag {:?} not found in IFD", tag)))
  }

  pub fn get_sub_ifd_all<T: TiffTag>(&self, tag: T) -> Option<&Vec<IFD>> {
    self.sub.get(&tag.into())
  }

  pub fn get_sub_ifd<T: TiffTag>(&self, tag: T) -> Option<&IFD> {
    let ifds = self.get_sub_ifd_all(tag)?;
    if ifds.len() > 1 {
      log::warn!(
        "get_sub_ifd() for tag {:?} found more IFDs than expected: {}. Fallback to first IFD!",
        tag,
        ifds.len()
      );
    }
    ifds.first()
  }
}
