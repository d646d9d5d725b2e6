// SPDX-License-Identifier: MIT
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{fmt::Display, io::Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::{Result, TiffError};
use crate::bits::Endian;

/// Type to represent tiff values of type `RATIONAL`
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub struct Rational {
  pub n: u32,
  pub d: u32,
}

impl Display for Rational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl Rational {
  pub fn new(n: u32, d: u32) -> Self {
    Self { n, d }
  }
}

/// Type to represent tiff values of type `SRATIONAL`
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub struct SRational {
  pub n: i32,
  pub d: i32,
}

impl Display for SRational {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_fmt(format_args!("{}/{}", self.n, self.d))
  }
}

impl SRational {
  pub fn new(n: i32, d: i32) -> Self {
    Self { n, d }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  /// 8-bit unsigned integer
  Byte(Vec<u8>),
  /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
  Ascii(TiffAscii),
  /// 16-bit unsigned integer
  Short(Vec<u16>),
  /// 32-bit unsigned integer
  Long(Vec<u32>),
  /// Fraction stored as two 32-bit unsigned integers
  Rational(Vec<Rational>),
  /// 8-bit signed integer
  SByte(Vec<i8>),
  /// 8-bit byte that may contain anything, depending on the field
  Undefined(Vec<u8>),
  /// 16-bit signed integer
  SShort(Vec<i16>),
  /// 32-bit signed integer
  SLong(Vec<i32>),
  /// Fraction stored as two 32-bit signed integers
  SRational(Vec<SRational>),
  /// 32-bit IEEE floating point
  Float(Vec<f32>),
  /// 64-bit IEEE floating point
  Double(Vec<f64>),
  /// Unknown type, wrapped in u8
  Unknown(u16, Vec<u8>),
}

impl Value {
  pub fn as_string(&self) -> Option<&String> {
    match self {
      Self::Ascii(v) => v.strings().first(),
      _ => None,
    }
  }

  pub fn get_u16(&self, idx: usize) -> Result<Option<u16>> {
    match self {
      Value::Byte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Short(v) => Ok(v.get(idx).map(ToOwned::to_owned)),
      Value::Long(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u16)),
      Value::SByte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u16)),
      Value::SShort(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u16)),
      Value::SLong(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u16)),
      _ => Err(TiffError::General(format!("Can not use get_u16() for tiff entry value {:?}", self))),
    }
  }

  pub fn get_u32(&self, idx: usize) -> Result<Option<u32>> {
    match self {
      Value::Byte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Short(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(Into::into)),
      Value::Long(v) => Ok(v.get(idx).map(ToOwned::to_owned)),
      Value::SByte(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      Value::SShort(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      Value::SLong(v) => Ok(v.get(idx).map(ToOwned::to_owned).map(|v| v as u32)),
      _ => Err(TiffError::General(format!("Can not use get_u32() for tiff entry value {:?}", self))),
    }
  }

  /// Collect all integer values, widened to u32
  pub fn as_u32_vec(&self) -> Result<Vec<u32>> {
    match self {
      Value::Byte(v) => Ok(v.iter().copied().map(Into::into).collect()),
      Value::Short(v) => Ok(v.iter().copied().map(Into::into).collect()),
      Value::Long(v) => Ok(v.clone()),
      _ => Err(TiffError::General(format!("Can not use as_u32_vec() for tiff entry value {:?}", self))),
    }
  }

  pub fn count(&self) -> usize {
    match self {
      Self::Byte(v) => v.len(),
      Self::Ascii(v) => v.count(),
      Self::Short(v) => v.len(),
      Self::Long(v) => v.len(),
      Self::Rational(v) => v.len(),
      Self::SByte(v) => v.len(),
      Self::Undefined(v) => v.len(),
      Self::SShort(v) => v.len(),
      Self::SLong(v) => v.len(),
      Self::SRational(v) => v.len(),
      Self::Float(v) => v.len(),
      Self::Double(v) => v.len(),
      Self::Unknown(_, v) => v.len(),
    }
  }

  pub fn byte_size(&self) -> usize {
    match self {
      Self::Byte(v) => v.len(),
      Self::Ascii(v) => v.count(),
      Self::Short(v) => v.len() * std::mem::size_of::<u16>(),
      Self::Long(v) => v.len() * std::mem::size_of::<u32>(),
      Self::Rational(v) => v.len() * 8,
      Self::SByte(v) => v.len(),
      Self::Undefined(v) => v.len(),
      Self::SShort(v) => v.len() * std::mem::size_of::<i16>(),
      Self::SLong(v) => v.len() * std::mem::size_of::<i32>(),
      Self::SRational(v) => v.len() * 8,
      Self::Float(v) => v.len() * std::mem::size_of::<f32>(),
      Self::Double(v) => v.len() * std::mem::size_of::<f64>(),
      Self::Unknown(_, v) => v.len(),
    }
  }

  /// Encode a value small enough to live inside the 4-byte
  /// entry field, left-justified as required by TIFF.
  pub fn as_embedded(&self, endian: Endian) -> Result<[u8; 4]> {
    if self.byte_size() > 4 {
      return Err(TiffError::Overflow(format!("Value of {} bytes can't be embedded", self.byte_size())));
    }
    let mut buf = Vec::with_capacity(4);
    self.write(&mut buf, endian)?;
    let mut out = [0_u8; 4];
    out[..buf.len()].copy_from_slice(&buf);
    Ok(out)
  }

  pub fn write(&self, w: &mut dyn Write, endian: Endian) -> Result<()> {
    match endian {
      Endian::Big => self.write_ordered::<BigEndian>(w),
      Endian::Little => self.write_ordered::<LittleEndian>(w),
    }
  }

  fn write_ordered<B: ByteOrder>(&self, w: &mut dyn Write) -> Result<()> {
    match self {
      Self::Byte(val) | Self::Undefined(val) | Self::Unknown(_, val) => {
        w.write_all(val)?;
      }
      Self::Ascii(val) => {
        w.write_all(&val.as_vec_with_nul())?;
      }
      Self::Short(val) => {
        for x in val {
          w.write_u16::<B>(*x)?;
        }
      }
      Self::Long(val) => {
        for x in val {
          w.write_u32::<B>(*x)?;
        }
      }
      Self::Rational(val) => {
        for x in val {
          w.write_u32::<B>(x.n)?;
          w.write_u32::<B>(x.d)?;
        }
      }
      Self::SByte(val) => {
        for x in val {
          w.write_i8(*x)?;
        }
      }
      Self::SShort(val) => {
        for x in val {
          w.write_i16::<B>(*x)?;
        }
      }
      Self::SLong(val) => {
        for x in val {
          w.write_i32::<B>(*x)?;
        }
      }
      Self::SRational(val) => {
        for x in val {
          w.write_i32::<B>(x.n)?;
          w.write_i32::<B>(x.d)?;
        }
      }
      Self::Float(val) => {
        for x in val {
          w.write_f32::<B>(*x)?;
        }
      }
      Self::Double(val) => {
        for x in val {
          w.write_f64::<B>(*x)?;
        }
      }
    }
    Ok(())
  }

  pub fn value_type(&self) -> u16 {
    match self {
      Self::Byte(_) => 1,
      Self::Ascii(_) => 2,
      Self::Short(_) => 3,
      Self::Long(_) => 4,
      Self::Rational(_) => 5,
      Self::SByte(_) => 6,
      Self::Undefined(_) => 7,
      Self::SShort(_) => 8,
      Self::SLong(_) => 9,
      Self::SRational(_) => 10,
      Self::Float(_) => 11,
      Self::Double(_) => 12,
      Self::Unknown(t, _) => *t,
    }
  }

}

/// One or more NUL terminated strings of an `ASCII` entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TiffAscii {
  strings: Vec<String>,
}

impl TiffAscii {
  pub fn new<T: AsRef<str>>(value: T) -> Self {
    Self {
      strings: vec![String::from(value.as_ref())],
    }
  }

  pub fn strings(&self) -> &Vec<String> {
    &self.strings
  }

  pub fn count(&self) -> usize {
    self.strings.iter().map(|s| s.len() + 1).sum::<usize>()
  }

  pub fn as_vec_with_nul(&self) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.count());
    for s in &self.strings {
      // Interior NULs would split the string on re-read
      out.extend(s.bytes().filter(|&c| c != 0));
      out.push(0);
    }
    out
  }

  pub fn new_from_raw(raw: &[u8]) -> Self {
    let mut strings = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
      let end = rest.iter().position(|&c| c == b'\0').unwrap_or(rest.len());
      strings.push(String::from_utf8_lossy(&rest[..end]).into_owned());
      rest = if end < rest.len() { &rest[end + 1..] } else { &[] };
    }
    if strings.is_empty() {
      strings.push(String::new());
    }
    Self { strings }
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::Ascii(TiffAscii::new(value))
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::Ascii(TiffAscii::new(&value))
  }
}

impl From<Rational> for Value {
  fn from(value: Rational) -> Self {
    Value::Rational(vec![value])
  }
}

impl From<u8> for Value {
  fn from(value: u8) -> Self {
    Value::Byte(vec![value])
  }
}

impl From<u16> for Value {
  fn from(value: u16) -> Self {
    Value::Short(vec![value])
  }
}

impl From<&[u16]> for Value {
  fn from(value: &[u16]) -> Self {
    Value::Short(value.into())
  }
}

impl<const N: usize> From<[u16; N]> for Value {
  fn from(value: [u16; N]) -> Self {
    Value::Short(value.into())
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Long(vec![value])
  }
}

impl From<&[u32]> for Value {
  fn from(value: &[u32]) -> Self {
    Value::Long(value.into())
  }
}

impl From<Vec<u32>> for Value {
  fn from(value: Vec<u32>) -> Self {
    Value::Long(value)
  }
}

impl<const N: usize> From<[u32; N]> for Value {
  fn from(value: [u32; N]) -> Self {
    Value::Long(value.into())
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::SLong(vec![value])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_short_is_left_justified() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let v = Value::Short(vec![8]);
    assert_eq!(v.as_embedded(Endian::Little)?, [8, 0, 0, 0]);
    assert_eq!(v.as_embedded(Endian::Big)?, [0, 8, 0, 0]);
    Ok(())
  }

  #[test]
  fn embedded_rejects_large_values() {
    let v = Value::Long(vec![1, 2]);
    assert!(matches!(v.as_embedded(Endian::Little), Err(TiffError::Overflow(_))));
  }

  #[test]
  fn ascii_multiple_strings() {
    let ascii = TiffAscii::new_from_raw(b"first\0second\0");
    assert_eq!(ascii.strings(), &vec!["first".to_string(), "second".to_string()]);
    assert_eq!(ascii.count(), 13);
    assert_eq!(ascii.as_vec_with_nul(), b"first\0second\0".to_vec());
  }
}
