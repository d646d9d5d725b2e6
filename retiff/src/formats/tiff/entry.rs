// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::{Read, Seek};

use log::trace;
use serde::{Deserialize, Serialize};

use super::{
  Rational, Result, SRational, TiffAscii, TiffError, Value,
  reader::{EndianReader, ReadByteOrder},
};

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SBYTE: u16 = 6;
const TYPE_UNDEFINED: u16 = 7;
const TYPE_SSHORT: u16 = 8;
const TYPE_SLONG: u16 = 9;
const TYPE_SRATIONAL: u16 = 10;
const TYPE_FLOAT: u16 = 11;
const TYPE_DOUBLE: u16 = 12;
const TYPE_IFD: u16 = 13;

/// Size of a single IFD entry record
pub const ENTRY_SIZE: u32 = 12;

// Guards allocations against corrupt counts
const MAX_ENTRY_BYTES: u64 = 1 << 28;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub tag: u16,
  pub value: Value,
  /// Offset of the value data for entries read from a file.
  /// Always `None` for entries built for writing.
  pub embedded: Option<u32>,
}

impl std::ops::Deref for Entry {
  type Target = Value;

  fn deref(&self) -> &Self::Target {
    &self.value
  }
}

// 0-1-2-3-4-5-6-7-8-9-10-11-12-13
const DATASHIFTS: [u8; 14] = [0, 0, 0, 1, 2, 3, 0, 0, 1, 2, 3, 2, 3, 2];

impl Entry {
  pub fn new<V: Into<Value>>(tag: u16, value: V) -> Self {
    Self {
      tag,
      value: value.into(),
      embedded: None,
    }
  }

  pub fn value_type(&self) -> u16 {
    self.value.value_type()
  }

  pub fn count(&self) -> u32 {
    self.value.count() as u32
  }

  /// Returns the offset of the value data, relative to `base`
  pub fn offset(&self) -> Option<usize> {
    self.embedded.map(|v| v as usize)
  }

  /// Parse an entry, the tag is already consumed from `reader`.
  pub fn parse<R: Read + Seek>(reader: &mut EndianReader<R>, base: u32, tag: u16) -> Result<Entry> {
    let pos = reader.position()? - 2;

    let typ = reader.read_u16()?;
    let count = reader.read_u32()?;

    trace!("Tag: {:#x}, Typ: {:#x}, count: {}", tag, typ, count);

    // If we don't know the type assume byte data (undefined)
    let compat_typ = if typ == 0 || typ > 13 { TYPE_UNDEFINED } else { typ };

    let bytesize: u64 = (count as u64) << DATASHIFTS[compat_typ as usize];
    if bytesize > MAX_ENTRY_BYTES {
      return Err(TiffError::Overflow(format!("Entry {:#x} claims {} bytes of data", tag, bytesize)));
    }
    let offset: u32 = if bytesize <= 4 { reader.position()? - base } else { reader.read_u32()? };

    reader.goto(base + offset)?;
    let count = count as usize;
    let value = match typ {
      TYPE_BYTE => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Byte(v)
      }
      TYPE_ASCII => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Ascii(TiffAscii::new_from_raw(&v))
      }
      TYPE_SHORT => {
        let mut v = vec![0; count];
        reader.read_u16_into(&mut v)?;
        Value::Short(v)
      }
      TYPE_LONG | TYPE_IFD => {
        let mut v = vec![0; count];
        reader.read_u32_into(&mut v)?;
        Value::Long(v)
      }
      TYPE_RATIONAL => {
        let mut tmp = vec![0; count * 2]; // Rational is 2x u32
        reader.read_u32_into(&mut tmp)?;
        Value::Rational(tmp.chunks_exact(2).map(|r| Rational::new(r[0], r[1])).collect())
      }
      TYPE_SBYTE => {
        let mut v = vec![0; count];
        reader.read_i8_into(&mut v)?;
        Value::SByte(v)
      }
      TYPE_UNDEFINED => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Undefined(v)
      }
      TYPE_SSHORT => {
        let mut v = vec![0; count];
        reader.read_i16_into(&mut v)?;
        Value::SShort(v)
      }
      TYPE_SLONG => {
        let mut v = vec![0; count];
        reader.read_i32_into(&mut v)?;
        Value::SLong(v)
      }
      TYPE_SRATIONAL => {
        let mut tmp = vec![0; count * 2]; // SRational is 2x i32
        reader.read_i32_into(&mut tmp)?;
        Value::SRational(tmp.chunks_exact(2).map(|r| SRational::new(r[0], r[1])).collect())
      }
      TYPE_FLOAT => {
        let mut v = vec![0.0; count];
        reader.read_f32_into(&mut v)?;
        Value::Float(v)
      }
      TYPE_DOUBLE => {
        let mut v = vec![0.0; count];
        reader.read_f64_into(&mut v)?;
        Value::Double(v)
      }
      x => {
        let mut v = vec![0; count];
        reader.read_u8_into(&mut v)?;
        Value::Unknown(x, v)
      }
    };
    reader.goto(pos + ENTRY_SIZE)?;
    Ok(Entry {
      tag,
      value,
      embedded: Some(offset),
    })
  }
}
