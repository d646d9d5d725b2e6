// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{
  collections::BTreeMap,
  io::{Seek, SeekFrom, Write},
};

use crate::{bits::Endian, tags::TiffTag};

use super::{Entry, Result, TIFF_MAGIC, TiffError, Value, entry::ENTRY_SIZE};

pub trait WriteAndSeek: Write + Seek {}

impl<T> WriteAndSeek for T where T: Write + Seek {}

/// Sequential TIFF writer
///
/// Pixel data and out-of-line values are written first, the IFD
/// follows. Each top-level IFD is linked into the chain when it is built,
/// so a writer that is dropped midway leaves a truncated chain behind.
pub struct TiffWriter<W: WriteAndSeek> {
  /// Position of the pointer that receives the next top-level IFD offset
  ifd_location: u64,
  endian: Endian,
  ifd_count: usize,
  writer: W,
}

impl<W: WriteAndSeek> TiffWriter<W> {
  pub fn new(writer: W, endian: Endian) -> Result<Self> {
    let mut tmp = Self {
      writer,
      endian,
      ifd_location: 0,
      ifd_count: 0,
    };
    tmp.write_header()?;
    Ok(tmp)
  }

  pub fn new_directory(&mut self) -> DirectoryWriter<'_, W> {
    DirectoryWriter::new(self)
  }

  pub fn endian(&self) -> Endian {
    self.endian
  }

  /// Number of top-level IFDs linked so far
  pub fn ifd_count(&self) -> usize {
    self.ifd_count
  }

  fn write_header(&mut self) -> Result<()> {
    self.writer.write_all(&self.endian.tiff_marker())?;
    self.write_u16(TIFF_MAGIC)?;
    self.ifd_location = self.writer.stream_position()?;
    self.write_u32(0_u32)?;
    Ok(())
  }

  fn write_u16(&mut self, v: u16) -> Result<()> {
    let mut buf = [0; 2];
    self.endian.write_u16(&mut buf, v);
    self.writer.write_all(&buf)?;
    Ok(())
  }

  fn write_u32(&mut self, v: u32) -> Result<()> {
    let mut buf = [0; 4];
    self.endian.write_u32(&mut buf, v);
    self.writer.write_all(&buf)?;
    Ok(())
  }

  pub(crate) fn pad_word_boundary(&mut self) -> Result<()> {
    let pos = self.position()?;
    if pos % 4 != 0 {
      let padding = [0, 0, 0];
      let padd_len = 4 - (pos % 4);
      self.writer.write_all(&padding[..padd_len as usize])?;
    }
    Ok(())
  }

  /// Write a block of data, word aligned, and return its offset
  pub fn write_data(&mut self, data: &[u8]) -> Result<u32> {
    self.pad_word_boundary()?;
    let offset = self.position()?;
    self.writer.write_all(data)?;
    Ok(offset)
  }

  /// Patch the pending chain pointer with `offset`, the IFD
  /// at `offset` becomes the last one of the chain.
  fn link_ifd(&mut self, offset: u32, next_ifd_location: u64) -> Result<()> {
    let end = self.writer.stream_position()?;
    self.writer.seek(SeekFrom::Start(self.ifd_location))?;
    self.write_u32(offset)?;
    self.writer.seek(SeekFrom::Start(end))?;
    self.ifd_location = next_ifd_location;
    self.ifd_count += 1;
    Ok(())
  }

  /// Finish the file and return the inner writer
  pub fn build(mut self) -> Result<W> {
    if self.ifd_count == 0 {
      return Err(TiffError::General("TIFF must contain at least one IFD".to_string()));
    }
    self.writer.flush()?;
    Ok(self.writer)
  }

  pub fn position(&mut self) -> Result<u32> {
    let pos = self.writer.stream_position()?;
    u32::try_from(pos).map_err(|_| TiffError::Overflow(format!("Output exceeds 4 GiB at position {}", pos)))
  }
}

pub struct DirectoryWriter<'a, W: WriteAndSeek> {
  pub tiff: &'a mut TiffWriter<W>,
  // We use BTreeMap to make sure tags are written in correct order
  entries: BTreeMap<u16, Entry>,
}

impl<'a, W: WriteAndSeek> DirectoryWriter<'a, W> {
  pub fn new(tiff: &'a mut TiffWriter<W>) -> Self {
    Self {
      tiff,
      entries: BTreeMap::new(),
    }
  }

  pub fn new_directory(&mut self) -> DirectoryWriter<'_, W> {
    DirectoryWriter::new(self.tiff)
  }

  pub fn entry_count(&self) -> u16 {
    self.entries.len() as u16
  }

  /// Write a detached IFD (like EXIF or GPS) and return its offset
  pub fn build(self) -> Result<u32> {
    let (offset, _, _) = self.write_ifd()?;
    Ok(offset)
  }

  /// Write the IFD and append it to the top-level chain
  pub fn build_chained(self) -> Result<u32> {
    let (offset, next_ifd_location, tiff) = self.write_ifd()?;
    tiff.link_ifd(offset, next_ifd_location)?;
    Ok(offset)
  }

  fn write_ifd(self) -> Result<(u32, u64, &'a mut TiffWriter<W>)> {
    if self.entries.is_empty() {
      return Err(TiffError::General("IFD is empty, not allowed by TIFF specification".to_string()));
    }
    let endian = self.tiff.endian;
    let mut fields = Vec::with_capacity(self.entries.len());
    for entry in self.entries.values() {
      let field = if entry.value.byte_size() > 4 {
        self.tiff.pad_word_boundary()?;
        let offset = self.tiff.position()?;
        entry.value.write(&mut self.tiff.writer, endian)?;
        let mut buf = [0; 4];
        endian.write_u32(&mut buf, offset);
        buf
      } else {
        entry.value.as_embedded(endian)?
      };
      fields.push(field);
    }

    self.tiff.pad_word_boundary()?;
    let offset = self.tiff.position()?;

    self.tiff.write_u16(self.entry_count())?;
    for ((tag, entry), field) in self.entries.iter().zip(fields) {
      self.tiff.write_u16(*tag)?;
      self.tiff.write_u16(entry.value_type())?;
      self.tiff.write_u32(entry.count())?;
      self.tiff.writer.write_all(&field)?;
    }
    let next_ifd_location = offset as u64 + 2 + ENTRY_SIZE as u64 * self.entries.len() as u64;
    self.tiff.write_u32(0)?; // Next IFD

    Ok((offset, next_ifd_location, self.tiff))
  }

  pub fn add_tag<T: TiffTag, V: Into<Value>>(&mut self, tag: T, value: V) {
    let tag: u16 = tag.into();
    self.entries.insert(tag, Entry::new(tag, value));
  }

  pub fn add_value<T: TiffTag>(&mut self, tag: T, value: Value) {
    let tag: u16 = tag.into();
    self.entries.insert(tag, Entry::new(tag, value));
  }

  pub fn add_entry(&mut self, entry: Entry) {
    self.entries.insert(entry.tag, Entry::new(entry.tag, entry.value));
  }

  pub fn write_data(&mut self, data: &[u8]) -> Result<u32> {
    self.tiff.write_data(data)
  }
}
